use serde::Serialize;
use std::collections::BTreeMap;

use crate::document::Element;

/// Number of leading frames that hold calibration poses rather than motion
/// (`identity`, `tpose`, `tpose-isb`).
pub const CONFIG_FRAME_COUNT: usize = 3;

/// An untyped field value as found in the document.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Attribute text.
    Text(String),
    /// A child element, possibly with nested structure.
    Node(Element),
}

impl RawValue {
    /// The text this value carries: the attribute text, or the node's text content.
    pub fn text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s),
            RawValue::Node(node) => node.text(),
        }
    }
}

/// A record as read from the document, before projection.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Where the record came from, e.g. `frames` or `frame[4]`; used in diagnostics.
    pub origin: String,

    /// Fields in document order.
    pub fields: Vec<(String, RawValue)>,
}

impl RawRecord {
    pub fn new(origin: impl Into<String>) -> Self {
        RawRecord {
            origin: origin.into(),
            fields: Vec::new(),
        }
    }

    /// Record over an element's attributes only.
    pub fn from_attributes(origin: impl Into<String>, element: &Element) -> Self {
        let mut record = RawRecord::new(origin);
        for (key, value) in element.attributes() {
            record.insert(key.rsplit(':').next().unwrap_or(key), RawValue::Text(value.clone()));
        }
        record
    }

    /// Record over an element's child fields merged with its attributes.
    ///
    /// Attributes take precedence over children of the same name, and the first child
    /// of a given name wins over later ones.
    pub fn from_element(origin: impl Into<String>, element: &Element) -> Self {
        let mut record = RawRecord::from_attributes(origin, element);
        for child in element.children() {
            if !record.contains(child.local_name()) {
                record.insert(child.local_name(), RawValue::Node(child.clone()));
            }
        }
        record
    }

    pub fn insert(&mut self, key: impl Into<String>, value: RawValue) {
        self.fields.push((key.into(), value));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }
}

/// A projected field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    FloatVec(Vec<f64>),
    /// Left as found: unregistered fields, and float vectors that failed to parse.
    Raw(RawValue),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            FieldValue::FloatVec(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&RawValue> {
        match self {
            FieldValue::Raw(raw) => Some(raw),
            _ => None,
        }
    }
}

/// A record after projection through a [`crate::FieldRegistry`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedRecord {
    pub fields: BTreeMap<String, FieldValue>,
}

impl TypedRecord {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn int(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(FieldValue::as_int)
    }

    pub fn floats(&self, field: &str) -> Option<&[f64]> {
        self.get(field).and_then(FieldValue::as_floats)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Frames of a recording split into calibration and motion frames.
#[derive(Debug, Clone)]
pub struct FrameInfo {
    /// Attributes of the frame container (`segmentCount`, `sensorCount`, `jointCount`).
    pub metadata: TypedRecord,

    /// The first [`CONFIG_FRAME_COUNT`] frames.
    pub config_frames: Vec<TypedRecord>,

    /// Every frame after the configuration frames, in document order.
    pub motion_frames: Vec<TypedRecord>,
}

impl FrameInfo {
    pub fn segment_count(&self) -> Option<i64> {
        self.metadata.int("segmentCount")
    }

    pub fn sensor_count(&self) -> Option<i64> {
        self.metadata.int("sensorCount")
    }

    pub fn joint_count(&self) -> Option<i64> {
        self.metadata.int("jointCount")
    }
}

/// One end of a joint: a point on a segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Connector {
    pub segment: String,
    pub point: String,
}

/// A joint as declared in the document, not yet resolved against the segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Joint {
    pub label: String,
    pub from: Connector,
    pub to: Connector,
}

/// A named point on a segment, in the segment's body frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Keypoint {
    pub label: String,
    pub position: [f64; 3],
}

/// A body segment of the skeleton.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    /// 1-based id, equal to the segment's position in the document.
    pub id: usize,
    pub label: String,
    pub points: Vec<Keypoint>,
}

impl Segment {
    pub fn point(&self, label: &str) -> Option<&Keypoint> {
        self.points.iter().find(|p| p.label == label)
    }
}

/// A single table cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Int(i) => write!(f, "{}", i),
            // Debug keeps the decimal point on whole numbers (`1.0`) and round-trips.
            Cell::Float(x) => write!(f, "{:?}", x),
            Cell::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// One flat table per flattened field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlattenedTable {
    /// The field the table was built from; also the file stem when written.
    pub name: String,

    pub header: Vec<String>,

    /// One row per motion frame, in frame order.
    pub rows: Vec<Vec<Cell>>,
}

impl FlattenedTable {
    pub fn column_count(&self) -> usize {
        self.header.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_element_prefers_attributes() {
        let element = Element::new("frame")
            .with_attribute("ms", "10")
            .with_child(Element::new("ms").with_text("99"))
            .with_child(Element::new("position").with_text("1 2 3"))
            .with_child(Element::new("position").with_text("4 5 6"));

        let record = RawRecord::from_element("frame[0]", &element);
        assert_eq!(record.fields.len(), 2);
        assert_eq!(record.fields[0], ("ms".to_string(), RawValue::Text("10".to_string())));
        assert_eq!(record.fields[1].1.text(), Some("1 2 3"));
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Int(3).to_string(), "3");
        assert_eq!(Cell::Float(1.0).to_string(), "1.0");
        assert_eq!(Cell::Float(-0.25).to_string(), "-0.25");
        assert_eq!(Cell::Bool(true).to_string(), "true");
    }
}
