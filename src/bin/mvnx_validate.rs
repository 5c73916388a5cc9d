//! mvnx-validate: Check MVNX recordings against a structural schema
//!
//! Usage:
//!   mvnx-validate -x session.mvnx -s mvnx_schema.json
//!
//!   # Exit non-zero and list the violations when validation fails
//!   mvnx-validate -x session.mvnx -s mvnx_schema.json --raise-if-error

use anyhow::{bail, Context, Result};
use clap::Parser;
use mvnx::logging::init_logging;
use mvnx::{Document, Schema};
use std::path::Path;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "mvnx-validate")]
#[command(about = "Validate MVNX recordings against a schema", long_about = None)]
struct Args {
    /// MVNX recording to validate
    #[arg(long, short = 'x')]
    xml_path: String,

    /// Schema (JSON) to validate against
    #[arg(long, short = 's')]
    schema_path: String,

    /// Fail with the list of violations instead of just reporting
    #[arg(long, short = 'I')]
    raise_if_error: bool,

    /// More log output (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let schema = Schema::from_json_file(&args.schema_path)
        .with_context(|| format!("Failed to load schema: {}", args.schema_path))?;

    // Parse without a schema so a failure is reported, not raised
    let document = Document::open(&args.xml_path, None)
        .with_context(|| format!("Failed to parse recording: {}", args.xml_path))?;

    let is_valid = if args.raise_if_error {
        if let Err(err) = schema.assert_valid(&document) {
            bail!("{}", err.report());
        }
        true
    } else {
        let violations = schema.violations(&document);
        for violation in &violations {
            debug!(%violation, "schema violation");
        }
        violations.is_empty()
    };

    let msg = if is_valid {
        "[VALIDATION PASSED]:"
    } else {
        "[VALIDATION FAILED]:"
    };
    println!("{} {} {}", msg, basename(&args.xml_path), basename(&args.schema_path));

    Ok(())
}

fn basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
