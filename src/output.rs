//! Report sinks: CSV, JSON lines and a console table.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::Args;
use color_eyre::eyre::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use serde::Serialize;

/// Where a report goes.
#[derive(Debug, Clone, Default, Args)]
pub struct SinkArgs {
    /// Write the report to a CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Write the report to a JSON lines file
    #[arg(long)]
    pub jsonl: Option<PathBuf>,

    /// Show the report on the console (default when no file is given)
    #[arg(long)]
    pub console: bool,
}

impl SinkArgs {
    fn console_enabled(&self) -> bool {
        self.console || (self.csv.is_none() && self.jsonl.is_none())
    }
}

/// A report written to every configured sink.
pub struct Report {
    title: String,
    csv: Option<csv::Writer<File>>,
    jsonl: Option<BufWriter<File>>,
    table: Option<Table>,
    rows: u64,
}

impl Report {
    pub fn open(sinks: &SinkArgs, title: &str, fields: &[&str]) -> Result<Self> {
        let csv = match sinks.csv {
            Some(ref path) => {
                let mut writer = csv::Writer::from_path(path)
                    .with_context(|| format!("Cannot create CSV file {}", path.display()))?;
                writer.write_record(fields)?;
                Some(writer)
            }
            None => None,
        };
        let jsonl = match sinks.jsonl {
            Some(ref path) => {
                let file = File::create(path)
                    .with_context(|| format!("Cannot create JSONL file {}", path.display()))?;
                Some(BufWriter::new(file))
            }
            None => None,
        };
        let table = sinks.console_enabled().then(|| {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL_CONDENSED)
                .set_content_arrangement(ContentArrangement::Dynamic);
            let header: Vec<Cell> = fields.iter().map(|f| Cell::new(f).fg(Color::Cyan)).collect();
            table.set_header(header);
            table
        });
        Ok(Self {
            title: title.to_string(),
            csv,
            jsonl,
            table,
            rows: 0,
        })
    }

    /// Add one row. `cells` go to CSV and console, `data` is the full record
    /// for JSON lines.
    pub fn write<T: Serialize>(&mut self, cells: &[String], data: &T) -> Result<()> {
        if let Some(ref mut writer) = self.csv {
            writer.write_record(cells)?;
        }
        if let Some(ref mut writer) = self.jsonl {
            serde_json::to_writer(&mut *writer, data)?;
            writer.write_all(b"\n")?;
        }
        if let Some(ref mut table) = self.table {
            table.add_row(cells);
        }
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush the files and print the table.
    pub fn finish(self) -> Result<()> {
        if let Some(mut writer) = self.csv {
            writer.flush()?;
        }
        if let Some(mut writer) = self.jsonl {
            writer.flush()?;
        }
        if let Some(table) = self.table {
            println!("{}", self.title);
            println!("{table}");
        }
        Ok(())
    }
}

pub fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
