use crate::types::FlattenedTable;
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes flattened tables as comma-separated text, one file per table
pub struct TableWriter {
    output_dir: PathBuf,
}

impl TableWriter {
    /// Create a new TableWriter that writes `<field>.csv` files in a directory
    pub fn new_dir_writer<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        std::fs::create_dir_all(&output_dir)
            .context("Failed to create output directory")?;

        Ok(TableWriter {
            output_dir: output_dir.as_ref().to_path_buf(),
        })
    }

    /// Path a table is written to
    pub fn table_path(&self, table: &FlattenedTable) -> PathBuf {
        self.output_dir.join(format!("{}.csv", table.name))
    }

    /// Write every table to its own file, returning the paths written
    pub fn write_tables(&self, tables: &BTreeMap<String, FlattenedTable>) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(tables.len());
        for table in tables.values() {
            let path = self.table_path(table);
            let file = File::create(&path)
                .with_context(|| format!("Failed to create file: {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            write_table(&mut writer, table)?;
            writer
                .flush()
                .with_context(|| format!("Failed to flush file: {}", path.display()))?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Write one table: header row, then one row per frame
pub fn write_table<W: Write>(writer: &mut W, table: &FlattenedTable) -> Result<()> {
    let header = table
        .header
        .iter()
        .map(|name| escape_field(name))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(writer, "{}", header)
        .context("Failed to write header")?;

    for row in &table.rows {
        let line = row
            .iter()
            .map(|cell| cell.to_string())
            .collect::<Vec<_>>()
            .join(",");
        writeln!(writer, "{}", line)
            .context("Failed to write row")?;
    }
    Ok(())
}

/// Quote a field holding a separator, quote or line break; inner quotes are doubled.
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
