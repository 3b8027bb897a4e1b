//! identifier - technical metadata for digital preservation.
//!
//! Usage:
//!   identifier index PATH --database DB      Index files into a database
//!   identifier index list --database DB      List indexed files
//!   identifier index folders --database DB   Folder statistics
//!   identifier index mime --database DB      Counts per mimetype
//!   identifier clearpath PATH --auto         Show names that need cleaning
//!   identifier files PATH --regexp RE        Find files by name
//!   identifier folders PATH --regexp RE      Find folders by name
//!   identifier ai --database DB              Describe folders with a model
//!   identifier ai ro-crate PATH --database DB
//!                                            Export descriptions as RO-Crate

mod commands;
mod logging;
mod output;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Result};

use identifier_core::AppConfig;

use crate::output::SinkArgs;

#[derive(Parser)]
#[command(
    name = "identifier",
    version,
    about = "A tool for technical metadata identification",
    long_about = "identifier indexes files of an archive into a database, reports on \
                  formats, duplicates and folders, sanitizes file names and \
                  describes folders with a language model."
)]
struct Cli {
    /// Configuration file (defaults to the per-user config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to this file as well
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Log level or filter (e.g. WARN, debug, identifier_index=trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Retrieve technical metadata from files
    Index(IndexArgs),

    /// Show or apply cleaned file and folder names
    Clearpath {
        /// Path to data
        path: PathBuf,

        /// Use the built-in cleaning rules
        #[arg(long)]
        auto: bool,

        /// Regular expression for custom renaming
        #[arg(long)]
        regexp: Option<String>,

        /// Replacement for --regexp matches
        #[arg(long, default_value = "")]
        replace: String,

        /// Rename on the filesystem (dry run otherwise)
        #[arg(long)]
        rename: bool,
    },

    /// Find files whose name matches a regular expression
    Files {
        /// Path to data
        path: PathBuf,

        /// Regular expression matched against file names
        #[arg(long)]
        regexp: String,

        /// Delete the matching files (dry run otherwise)
        #[arg(long)]
        remove: bool,
    },

    /// Find folders whose name matches a regular expression
    Folders {
        /// Path to data
        path: PathBuf,

        /// Regular expression matched against folder names
        #[arg(long)]
        regexp: String,

        /// Delete the matching folders with everything in them (dry run otherwise)
        #[arg(long)]
        remove: bool,
    },

    /// Describe folders with a language model
    Ai(AiArgs),
}

#[derive(Args)]
#[command(args_conflicts_with_subcommands = true)]
struct IndexArgs {
    #[command(subcommand)]
    command: Option<IndexCommand>,

    /// Path to data
    path: Option<PathBuf>,

    /// Database folder (a temporary one is used when omitted)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short = 'n', long)]
    concurrent: Option<usize>,

    /// Identification actions
    #[arg(long, value_delimiter = ',')]
    actions: Vec<String>,

    #[command(flatten)]
    sinks: SinkArgs,
}

#[derive(Subcommand)]
enum IndexCommand {
    /// List indexed files
    List {
        #[command(flatten)]
        database: DatabaseArgs,

        #[command(flatten)]
        filter: FilterArgs,

        /// Delete the selected files below this data path and drop their records
        #[arg(long)]
        remove: Option<PathBuf>,

        #[command(flatten)]
        sinks: SinkArgs,
    },

    /// Files, folders and bytes per folder
    Folders {
        #[command(flatten)]
        database: DatabaseArgs,

        /// Folder path prefix
        #[arg(long, default_value = "")]
        prefix: String,

        #[command(flatten)]
        sinks: SinkArgs,
    },

    /// Files and bytes per mimetype
    Mime {
        #[command(flatten)]
        database: DatabaseArgs,

        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        sinks: SinkArgs,
    },

    /// Files and bytes per PRONOM id
    Pronom {
        #[command(flatten)]
        database: DatabaseArgs,

        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        sinks: SinkArgs,
    },
}

#[derive(Args)]
struct DatabaseArgs {
    /// Database folder
    #[arg(long = "database")]
    path: PathBuf,
}

#[derive(Args)]
struct FilterArgs {
    /// Folder path prefix
    #[arg(long, default_value = "")]
    prefix: String,

    /// Include empty files
    #[arg(long)]
    empty: bool,

    /// Include duplicate files
    #[arg(long)]
    duplicates: bool,

    /// Include files whose name matches this regular expression
    #[arg(long)]
    regexp: Option<String>,
}

#[derive(Args)]
#[command(args_conflicts_with_subcommands = true)]
struct AiArgs {
    #[command(subcommand)]
    command: Option<AiCommand>,

    /// Database folder
    #[arg(long)]
    database: Option<PathBuf>,

    /// Folder path prefix
    #[arg(long, default_value = "")]
    prefix: String,

    /// Model as <driver>-<model>, e.g. google-gemini-2.0-pro-exp-02-05
    #[arg(long)]
    model: Option<String>,

    /// API key; %%NAME%% reads the environment variable NAME
    #[arg(long)]
    apikey: Option<String>,

    /// Query text, or a file containing it
    #[arg(long)]
    query: Option<String>,

    /// Text put in front of the query, or a file containing it
    #[arg(long)]
    additional_query: Option<String>,

    #[command(flatten)]
    sinks: SinkArgs,
}

#[derive(Subcommand)]
enum AiCommand {
    /// List stored folder descriptions
    List {
        #[command(flatten)]
        database: DatabaseArgs,

        /// Model whose descriptions are listed
        #[arg(long)]
        model: Option<String>,

        /// Folder path prefix
        #[arg(long, default_value = "")]
        prefix: String,

        #[command(flatten)]
        sinks: SinkArgs,
    },

    /// Merge stored folder descriptions into ro-crate-metadata.json
    RoCrate {
        /// Path to data
        path: PathBuf,

        #[command(flatten)]
        database: DatabaseArgs,

        /// Model whose descriptions are exported
        #[arg(long)]
        model: Option<String>,

        /// Folder path prefix
        #[arg(long, default_value = "")]
        prefix: String,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("Cannot load configuration")?;
    let log_file = cli.log_file.clone().or_else(|| config.log.file.clone());
    let _guard = logging::init(cli.log_level.as_deref(), &config.log.level, log_file.as_deref())?;

    match cli.command {
        Command::Index(args) => match args.command {
            None => commands::run_index(
                args.path.as_deref(),
                args.database.as_deref(),
                args.concurrent,
                args.actions,
                &args.sinks,
                &config,
            )?,
            Some(IndexCommand::List {
                database,
                filter,
                remove,
                sinks,
            }) => commands::run_index_list(&database.path, &filter, remove, &sinks)?,
            Some(IndexCommand::Folders {
                database,
                prefix,
                sinks,
            }) => commands::run_index_folders(&database.path, &prefix, &sinks)?,
            Some(IndexCommand::Mime {
                database,
                filter,
                sinks,
            }) => commands::run_index_formats(
                &database.path,
                &filter,
                identifier_analyze::FormatKey::Mimetype,
                &sinks,
            )?,
            Some(IndexCommand::Pronom {
                database,
                filter,
                sinks,
            }) => commands::run_index_formats(
                &database.path,
                &filter,
                identifier_analyze::FormatKey::Pronom,
                &sinks,
            )?,
        },
        Command::Clearpath {
            path,
            auto,
            regexp,
            replace,
            rename,
        } => commands::run_clearpath(&path, auto, regexp.as_deref(), &replace, rename)?,
        Command::Files {
            path,
            regexp,
            remove,
        } => commands::run_files(&path, &regexp, remove)?,
        Command::Folders {
            path,
            regexp,
            remove,
        } => commands::run_folders(&path, &regexp, remove)?,
        Command::Ai(mut args) => match args.command.take() {
            None => commands::run_ai(&args, &config)?,
            Some(AiCommand::List {
                database,
                model,
                prefix,
                sinks,
            }) => {
                let model = model.unwrap_or_else(|| config.ai.model.clone());
                commands::run_ai_list(&database.path, &model, &prefix, &sinks)?
            }
            Some(AiCommand::RoCrate {
                path,
                database,
                model,
                prefix,
            }) => {
                let model = model.unwrap_or_else(|| config.ai.model.clone());
                commands::run_ai_ro_crate(&path, &database.path, &model, &prefix)?
            }
        },
    }

    Ok(())
}
