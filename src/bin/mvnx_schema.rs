//! mvnx-schema: Infer a structural schema from known-good MVNX recordings
//!
//! Attributes seen on every sample become required, child counts take the observed
//! bounds and value kinds (integer, float, float vector, timecode) are detected per
//! attribute.
//!
//! Usage:
//!   mvnx-schema good_1.mvnx good_2.mvnx > mvnx_schema.json
//!
//!   # Single-line output written to a file
//!   mvnx-schema --compact -o mvnx_schema.json good_1.mvnx

use anyhow::{bail, Context, Result};
use clap::Parser;
use mvnx::logging::init_logging;
use mvnx::{Document, SchemaBuilder};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mvnx-schema")]
#[command(about = "Infer an MVNX schema from sample recordings", long_about = None)]
struct Args {
    /// Sample recordings
    #[arg(value_name = "FILE", required = true)]
    inputs: Vec<String>,

    /// Compact output (no pretty-printing)
    #[arg(long)]
    compact: bool,

    /// Write the schema to a file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<String>,

    /// More log output (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut builder = SchemaBuilder::new();
    for path in &args.inputs {
        let document = Document::open(path, None)
            .with_context(|| format!("Failed to parse recording: {}", path))?;
        builder.add_document(&document);
    }

    if builder.sample_count() == 0 {
        bail!("No recordings given");
    }
    info!(samples = builder.sample_count(), "inferring schema");

    let schema = builder.build();
    let output = if args.compact {
        serde_json::to_string(&schema)?
    } else {
        schema.to_json_pretty()?
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, output + "\n")
                .with_context(|| format!("Failed to write schema: {}", path))?;
        }
        None => println!("{}", output),
    }

    Ok(())
}
