//! mvnx-melt: Flatten an MVNX recording into one CSV table per field
//!
//! Usage:
//!   # Every supported field present in the recording, one CSV each
//!   mvnx-melt session.mvnx --output-dir ./tables
//!
//!   # Selected fields, validating against a schema first
//!   mvnx-melt session.mvnx -S mvnx_schema.json -F position,jointAngle -o ./tables
//!
//!   # Shape of the tables only, as JSON
//!   mvnx-melt session.mvnx --summary
//!
//! Without `--output-dir` or `--summary` every table is written to stdout, each one
//! introduced by a `# <field>` line.

use anyhow::{Context, Result};
use clap::Parser;
use mvnx::flatten::write_table;
use mvnx::logging::init_logging;
use mvnx::{ExtractConfig, FieldRegistry, FlattenedTable, Mvnx, Schema, TableWriter};
use serde_json::json;
use std::collections::BTreeMap;
use std::io::Write;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mvnx-melt")]
#[command(about = "Flatten MVNX motion capture recordings into CSV tables", long_about = None)]
struct Args {
    /// MVNX recording to read
    #[arg(value_name = "FILE")]
    input: String,

    /// Schema (JSON) to validate the recording against before extraction
    #[arg(long, short = 'S')]
    schema: Option<String>,

    /// Field registry (JSON) replacing the built-in MVNX 4 vocabulary
    #[arg(long)]
    registry: Option<String>,

    /// Comma-separated fields to flatten (default: every supported field present)
    #[arg(long, short = 'F', value_delimiter = ',')]
    fields: Vec<String>,

    /// Output directory for one `<field>.csv` per table
    #[arg(long, short = 'o')]
    output_dir: Option<String>,

    /// Print a JSON summary of the tables instead of their contents
    #[arg(long, conflicts_with = "output_dir")]
    summary: bool,

    /// Write exported markup next to the tables, stamped with a provenance note
    #[arg(long, requires = "output_dir")]
    export: bool,

    /// More log output (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    // Build config
    let mut config = ExtractConfig::default();
    if let Some(path) = &args.registry {
        config.registry = FieldRegistry::from_json_file(path)
            .with_context(|| format!("Failed to load registry: {}", path))?;
    }

    let schema = match &args.schema {
        Some(path) => Some(
            Schema::from_json_file(path).with_context(|| format!("Failed to load schema: {}", path))?,
        ),
        None => None,
    };

    let recording = Mvnx::open(&args.input, schema.as_ref())
        .with_context(|| format!("Failed to load recording: {}", args.input))?
        .with_config(config);

    let fields: Vec<String> = if args.fields.is_empty() {
        recording
            .available_channels()?
            .into_iter()
            .map(|c| c.field_name().to_string())
            .collect()
    } else {
        args.fields.iter().map(|f| f.trim().to_string()).collect()
    };
    info!(fields = ?fields, "flattening");

    let tables = recording.flatten(&fields)?;

    if args.summary {
        print_summary(&args.input, &tables)?;
    } else if let Some(output_dir) = &args.output_dir {
        let writer = TableWriter::new_dir_writer(output_dir)?;
        let written = writer.write_tables(&tables)?;
        for path in &written {
            info!(path = %path.display(), "wrote table");
        }

        if args.export {
            let path = std::path::Path::new(output_dir).join("export.mvnx");
            recording
                .export(&path, &format!("Tables: {}.", fields.join(", ")))
                .context("Failed to export recording")?;
        }
        eprintln!("Wrote {} tables to {}", written.len(), output_dir);
    } else {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for table in tables.values() {
            writeln!(out, "# {}", table.name)?;
            write_table(&mut out, table)?;
        }
        out.flush()?;
    }

    Ok(())
}

fn print_summary(input: &str, tables: &BTreeMap<String, FlattenedTable>) -> Result<()> {
    let summary: Vec<_> = tables
        .values()
        .map(|t| {
            json!({
                "field": t.name,
                "columns": t.column_count(),
                "rows": t.rows.len(),
                "header": t.header,
            })
        })
        .collect();

    let output = json!({ "input": input, "tables": summary });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
