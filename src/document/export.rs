//! Writing a document back out as MVNX markup.

use chrono::{DateTime, Local};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

use crate::document::{Document, Element};
use crate::error::{MvnxError, Result};

/// Root attribute carrying the export provenance note.
pub const EXPORT_ATTRIBUTE: &str = "exportComment";

/// Build the provenance note stamped on exported documents.
///
/// Looks like `Exported from mvnx on 10_Feb_2018_20:10:16.151 (+01:00). extra`.
pub fn provenance_annotation(timestamp: DateTime<Local>, extra: &str) -> String {
    let ts = timestamp.format("%d_%b_%Y_%H:%M:%S%.3f (%:z)");
    format!("Exported from {} on {}. {}", env!("CARGO_PKG_NAME"), ts, extra)
        .trim_end()
        .to_string()
}

/// Serialize a document, setting [`EXPORT_ATTRIBUTE`] on the root to `annotation`.
///
/// The document itself is left untouched; an existing annotation is replaced in the
/// output only.
pub fn write_document<W: Write>(
    document: &Document,
    writer: W,
    annotation: &str,
    pretty: bool,
) -> Result<()> {
    let mut writer = if pretty {
        Writer::new_with_indent(writer, b' ', 2)
    } else {
        Writer::new(writer)
    };

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;
    write_element(&mut writer, document.root(), Some(annotation))?;
    writer.into_inner().flush()?;
    Ok(())
}

fn write_element<W: Write>(
    writer: &mut Writer<W>,
    element: &Element,
    annotation: Option<&str>,
) -> Result<()> {
    let mut start = BytesStart::new(element.name());
    for (key, value) in element.attributes() {
        if annotation.is_some() && key == EXPORT_ATTRIBUTE {
            continue;
        }
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if let Some(note) = annotation {
        start.push_attribute((EXPORT_ATTRIBUTE, note));
    }

    if element.children().is_empty() && element.text().is_none() {
        return writer.write_event(Event::Empty(start)).map_err(xml_error);
    }

    writer.write_event(Event::Start(start)).map_err(xml_error)?;
    if let Some(text) = element.text() {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_error)?;
    }
    for child in element.children() {
        write_element(writer, child, None)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name())))
        .map_err(xml_error)
}

fn xml_error(e: impl std::fmt::Display) -> MvnxError {
    MvnxError::Xml(e.to_string())
}
