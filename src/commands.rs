//! Command implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use color_eyre::eyre::{Context, Result, bail};
use regex::Regex;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use identifier_ai::{
    DEFAULT_QUERY, HttpDescriptionService, compose_query, describe_folders, export_ro_crate,
    list_descriptors, load_query, resolve_api_key,
};
use identifier_analyze::{FolderAggregator, FormatKey, FormatStats, ReportQuery};
use identifier_core::{AppConfig, ClearRule, FolderDescriptor, IndexConfig, IndexRecord, resolve_full_path};
use identifier_index::{BasicEngine, Indexer};
use identifier_scan::{JwalkWalker, ScanProgress};
use identifier_store::{RecordStore, VisitError};

use crate::output::{Report, SinkArgs, format_size};
use crate::{AiArgs, FilterArgs};

const RECORD_FIELDS: [&str; 14] = [
    "path",
    "folder",
    "basename",
    "size",
    "lastmod",
    "duplicate",
    "mimetype",
    "pronom",
    "type",
    "subtype",
    "checksum",
    "width",
    "height",
    "duration",
];

fn record_cells(record: &IndexRecord) -> Vec<String> {
    let ident = &record.identification;
    let lastmod = chrono::DateTime::from_timestamp(record.last_modified, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default();
    vec![
        record.path.clone(),
        record.folder.clone(),
        record.basename.clone(),
        record.size.to_string(),
        lastmod,
        record.duplicate.to_string(),
        ident.mimetype.clone(),
        ident.pronom.clone(),
        ident.kind.clone(),
        ident.subtype.clone(),
        record.checksum().unwrap_or_default().to_string(),
        ident.width.to_string(),
        ident.height.to_string(),
        ident.duration.to_string(),
    ]
}

/// Resolve a data path given on the command line and make sure it is a folder.
fn data_dir(path: &Path) -> Result<PathBuf> {
    let full = resolve_full_path(path)
        .with_context(|| format!("Cannot resolve {}", path.display()))?;
    if !full.is_dir() {
        bail!("'{}' is not a directory", full.display());
    }
    Ok(full)
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).with_context(|| format!("Cannot compile regular expression '{pattern}'"))
}

fn open_read_only(database: &Path) -> Result<RecordStore> {
    RecordStore::open_read_only(database)
        .with_context(|| format!("Cannot open database {}", database.display()))
}

fn open_read_write(database: &Path) -> Result<RecordStore> {
    RecordStore::open_read_write(database)
        .with_context(|| format!("Cannot open database {}", database.display()))
}

/// Print the `#including ...` lines describing a selection.
fn print_selection(filter: &FilterArgs, removing: bool) {
    if let Some(ref regexp) = filter.regexp {
        println!("#including regexp \"{regexp}\"");
    }
    if filter.empty {
        println!("#including empty files");
    }
    if filter.duplicates {
        println!("#including duplicate files");
    }
    if !filter.prefix.is_empty() {
        println!("#including prefix \"{}\"", filter.prefix);
    }
    if filter.regexp.is_none() && !filter.empty && !filter.duplicates {
        println!("#including all files");
    }
    if removing {
        println!("#removing files");
    }
}

fn build_query(filter: &FilterArgs, remove: Option<PathBuf>) -> Result<ReportQuery> {
    let mut builder = ReportQuery::builder();
    builder
        .prefix(filter.prefix.clone())
        .empty(filter.empty)
        .duplicates(filter.duplicates);
    if let Some(ref regexp) = filter.regexp {
        builder.regex(compile(regexp)?);
    }
    if let Some(root) = remove {
        builder.remove(root);
    }
    builder.build().context("Invalid selection")
}

pub fn run_index(
    path: Option<&Path>,
    database: Option<&Path>,
    concurrent: Option<usize>,
    actions: Vec<String>,
    sinks: &SinkArgs,
    config: &AppConfig,
) -> Result<()> {
    if path.is_none() && database.is_none() {
        bail!("either data path or database folder must be set");
    }

    // Without a database the records only live for this run.
    let temp_db;
    let database = match database {
        Some(database) => database.to_path_buf(),
        None => {
            temp_db = tempfile::TempDir::new().context("Cannot create temporary database")?;
            temp_db.path().to_path_buf()
        }
    };
    let store = Arc::new(open_read_write(&database)?);

    let started_at = match path {
        Some(path) => Some(index_folder(path, concurrent, actions, config, &store)?),
        None => None,
    };

    let mut report = Report::open(sinks, "Index", &RECORD_FIELDS)?;
    store
        .scan_records("", |record| {
            if started_at.is_none_or(|t| record.last_seen == t) {
                report.write(&record_cells(record), record).map_err(VisitError::from)?;
            }
            Ok(false)
        })
        .context("Cannot list records")?;
    report.finish()
}

/// Index a data folder into `store`, returning the run's start time.
fn index_folder(
    path: &Path,
    concurrent: Option<usize>,
    actions: Vec<String>,
    config: &AppConfig,
    store: &Arc<RecordStore>,
) -> Result<i64> {
    let root = data_dir(path)?;
    let actions = if actions.is_empty() {
        config.indexer.actions.clone()
    } else {
        actions
    };
    let index_config = IndexConfig::builder()
        .root(root.clone())
        .workers(concurrent.unwrap_or(config.indexer.workers))
        .actions(actions)
        .build()
        .context("Invalid index configuration")?;
    let started_at = index_config.started_at;

    eprintln!("Indexing {}...", root.display());
    let walker = JwalkWalker::new();
    let reporter = spawn_progress_logger(walker.subscribe());
    let indexer = Indexer::new(index_config, Arc::new(BasicEngine::new())).with_walker(walker);
    let result = indexer.run(Arc::clone(store));
    // Dropping the walker closes the progress channel.
    drop(indexer);
    let _ = reporter.join();
    let summary = result.context("Indexing failed")?;
    eprintln!(
        "{} files in {:.2}s: {} identified, {} cached, {} duplicates, {} failed",
        summary.files,
        summary.elapsed.as_secs_f64(),
        summary.stats.identified,
        summary.stats.cached,
        summary.stats.duplicates,
        summary.stats.failed,
    );
    Ok(started_at)
}

fn spawn_progress_logger(mut rx: broadcast::Receiver<ScanProgress>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        loop {
            match rx.blocking_recv() {
                Ok(progress) => tracing::info!(
                    files = progress.files_found,
                    dirs = progress.dirs_found,
                    files_per_second = progress.files_per_second(),
                    "walking"
                ),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}

pub fn run_index_list(
    database: &Path,
    filter: &FilterArgs,
    remove: Option<PathBuf>,
    sinks: &SinkArgs,
) -> Result<()> {
    let removing = remove.is_some();
    let query = build_query(filter, remove)?;
    print_selection(filter, removing);

    let store = if removing {
        open_read_write(database)?
    } else {
        open_read_only(database)?
    };

    let mut report = Report::open(sinks, "Index", &RECORD_FIELDS)?;
    let summary = query
        .run(&store, |record| {
            report.write(&record_cells(record), record).map_err(VisitError::from)?;
            let Some(ref root) = query.remove else {
                return Ok(false);
            };
            match identifier_ops::remove_file(root, &record.path) {
                Ok(_) => Ok(true),
                Err(err) => {
                    tracing::error!(error = %err, "cannot remove file");
                    Ok(false)
                }
            }
        })
        .context("Cannot list records")?;
    let listed = report.rows();
    report.finish()?;

    if removing {
        eprintln!(
            "{} records, {} removed, {} not dropped from the database",
            listed,
            summary.deleted,
            summary.failed
        );
    }
    Ok(())
}

pub fn run_index_folders(database: &Path, prefix: &str, sinks: &SinkArgs) -> Result<()> {
    let store = open_read_only(database)?;
    let aggregator = FolderAggregator::from_store(&store, prefix).context("Cannot read records")?;

    let mut report = Report::open(
        sinks,
        "Folder statistics",
        &["Files", "Folders", "Bytes", "Size", "Path"],
    )?;
    for row in aggregator.rows() {
        let cells = vec![
            row.files.to_string(),
            row.folders.to_string(),
            row.bytes.to_string(),
            format_size(row.bytes),
            row.path.clone(),
        ];
        report.write(&cells, &row)?;
    }
    report.finish()
}

pub fn run_index_formats(
    database: &Path,
    filter: &FilterArgs,
    key: FormatKey,
    sinks: &SinkArgs,
) -> Result<()> {
    let query = build_query(filter, None)?;
    print_selection(filter, false);

    let store = open_read_only(database)?;
    let stats = FormatStats::from_store(&store, &query, key).context("Cannot read records")?;

    let key_name = key.to_string();
    let mut report = Report::open(
        sinks,
        &format!("Files per {key_name}"),
        &[key_name.as_str(), "count", "size (bytes)", "size"],
    )?;
    for row in stats.rows() {
        let cells = vec![
            row.format.clone(),
            row.count.to_string(),
            row.bytes.to_string(),
            format_size(row.bytes),
        ];
        report.write(&cells, row)?;
    }
    report.finish()
}

pub fn run_clearpath(
    path: &Path,
    auto: bool,
    regexp: Option<&str>,
    replace: &str,
    rename: bool,
) -> Result<()> {
    let root = data_dir(path)?;
    let rule = match regexp {
        Some(pattern) => {
            println!("#including regexp \"{pattern}\"");
            ClearRule::replace(compile(pattern)?, replace).with_auto(auto)
        }
        None if auto => ClearRule::auto(),
        None => bail!("either --auto or --regexp must be set"),
    };

    let tree = JwalkWalker::new().build_tree(&root).context("Cannot read folder")?;
    let renames: Vec<_> = tree.clear(&rule).collect();
    for change in &renames {
        print!("    {}\n--> {}\n\n", change.from, change.to);
    }

    if rename {
        let complete = identifier_ops::apply_renames(&root, renames);
        eprintln!("{}", complete.summary());
    }
    Ok(())
}

pub fn run_files(path: &Path, regexp: &str, remove: bool) -> Result<()> {
    let root = data_dir(path)?;
    let pattern = compile(regexp)?;
    let tree = JwalkWalker::new().build_tree(&root).context("Cannot read folder")?;

    let matches: Vec<_> = tree.find_basename(&pattern).collect();
    for name in &matches {
        println!("{name}");
    }

    if remove {
        let complete = identifier_ops::remove_files(&root, &matches);
        eprintln!("{} ({})", complete.summary(), format_size(complete.bytes_processed));
    }
    Ok(())
}

pub fn run_folders(path: &Path, regexp: &str, remove: bool) -> Result<()> {
    let root = data_dir(path)?;
    let pattern = compile(regexp)?;
    let tree = JwalkWalker::new().build_tree(&root).context("Cannot read folder")?;

    let matches: Vec<_> = tree.find_dirname(&pattern).collect();
    for name in &matches {
        println!("{name}");
    }

    if remove {
        let complete = identifier_ops::remove_folders(&root, &matches);
        eprintln!("{} ({})", complete.summary(), format_size(complete.bytes_processed));
    }
    Ok(())
}

fn descriptor_cells(descriptor: &FolderDescriptor, full: bool) -> Vec<String> {
    let mut cells = vec![
        descriptor.folder.clone(),
        descriptor.title.clone(),
        descriptor.description.clone(),
        descriptor.place.clone(),
        descriptor.date.clone(),
    ];
    if full {
        let persons: Vec<String> = descriptor.persons.iter().map(ToString::to_string).collect();
        cells.push(descriptor.tags.join("; "));
        cells.push(persons.join("; "));
        cells.push(descriptor.institutions.join("; "));
    }
    cells
}

pub fn run_ai(args: &AiArgs, config: &AppConfig) -> Result<()> {
    let Some(ref database) = args.database else {
        bail!("--database is required");
    };
    let model = args.model.clone().unwrap_or_else(|| config.ai.model.clone());
    let api_key = resolve_api_key(args.apikey.as_deref().unwrap_or(&config.ai.api_key))?;

    let query = load_query(args.query.as_deref().unwrap_or_default())?;
    let query = if query.trim().is_empty() {
        DEFAULT_QUERY.to_string()
    } else {
        query
    };
    let additional = load_query(args.additional_query.as_deref().unwrap_or_default())?;
    let query = compose_query(&query, &additional);

    let service = HttpDescriptionService::new(&model, api_key, config.ai.endpoint.clone())
        .context("Cannot create description service")?;
    let store = open_read_write(database)?;

    let descriptors = describe_folders(&service, &store, &model, &args.prefix, &query)
        .context("Folder description failed")?;

    let mut report = Report::open(
        &args.sinks,
        "Folder descriptions",
        &["folder", "title", "description", "place", "date"],
    )?;
    for descriptor in &descriptors {
        report.write(&descriptor_cells(descriptor, false), descriptor)?;
    }
    report.finish()
}

pub fn run_ai_list(database: &Path, model: &str, prefix: &str, sinks: &SinkArgs) -> Result<()> {
    if !prefix.is_empty() {
        println!("#including prefix \"{prefix}\"");
    }
    let store = open_read_only(database)?;
    let descriptors = list_descriptors(&store, model, prefix).context("Cannot read descriptions")?;

    let mut report = Report::open(
        sinks,
        "Folder descriptions",
        &[
            "folder",
            "title",
            "description",
            "place",
            "date",
            "tags",
            "persons",
            "institutions",
        ],
    )?;
    for descriptor in &descriptors {
        report.write(&descriptor_cells(descriptor, true), descriptor)?;
    }
    report.finish()
}

pub fn run_ai_ro_crate(path: &Path, database: &Path, model: &str, prefix: &str) -> Result<()> {
    let data = data_dir(path)?;
    let store = open_read_only(database)?;
    let (written, merged) =
        export_ro_crate(&store, model, prefix, &data).context("RO-Crate export failed")?;
    eprintln!("{merged} folder descriptions written to {}", written.display());
    Ok(())
}
