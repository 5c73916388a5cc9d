//! Document loading and re-serialization.
//!
//! A [`Document`] owns the element tree of one recording. It is built once and never
//! mutated; every extractor reads from it through shared references.

pub mod export;
pub mod tree;

use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

use crate::error::Result;
use crate::schema::Schema;

pub use export::{provenance_annotation, write_document, EXPORT_ATTRIBUTE};
pub use tree::Element;

/// A parsed MVNX document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Wrap an already-built element tree.
    pub fn from_root(root: Element) -> Self {
        Document { root }
    }

    /// Parse a document held in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the markup is malformed, or if a schema is given and the
    /// document does not satisfy it.
    pub fn parse_str(xml: &str, schema: Option<&Schema>) -> Result<Self> {
        Self::from_reader(xml.as_bytes(), schema)
    }

    /// Parse a document from any buffered reader.
    pub fn from_reader<R: BufRead>(source: R, schema: Option<&Schema>) -> Result<Self> {
        let mut reader = Reader::from_reader(source);
        let document = Document {
            root: tree::parse_reader(&mut reader)?,
        };

        match schema {
            Some(schema) => {
                schema.assert_valid(&document)?;
                debug!(root = schema.root.as_str(), "document passed schema validation");
            }
            None => debug!("no schema given, skipping validation"),
        }

        Ok(document)
    }

    /// Load and parse a document from disk.
    pub fn open<P: AsRef<Path>>(path: P, schema: Option<&Schema>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let document = Self::from_reader(BufReader::new(file), schema)?;
        info!(path = %path.display(), "loaded MVNX document");
        Ok(document)
    }

    /// The root element (`mvnx`).
    pub fn root(&self) -> &Element {
        &self.root
    }
}
