//! Document schemas
//!
//! A lightweight structural schema for MVNX element trees, stored as JSON. Schemas
//! can be written by hand or inferred from known-good recordings with
//! [`SchemaBuilder`], then used to reject documents before any extraction runs.

pub mod builder;
pub mod validate;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{MvnxError, Result};

pub use builder::SchemaBuilder;

static INTEGER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+$").unwrap());

static FLOAT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").unwrap()
});

static FLOAT_VECTOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?( [+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?)+$")
        .unwrap()
});

// MVN timecodes: 00:01:02.250 or 00:01:02:15 (frames)
static TIMECODE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2}([.:]\d+)?$").unwrap());

/// Kind of text an attribute or element carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Integer,
    Float,
    FloatVector,
    Timecode,
    String,
}

impl ValueKind {
    /// Most specific kind matching a non-empty value.
    pub fn detect(value: &str) -> Option<ValueKind> {
        if value.is_empty() {
            return None;
        }
        let kind = if INTEGER_REGEX.is_match(value) {
            ValueKind::Integer
        } else if FLOAT_REGEX.is_match(value) {
            ValueKind::Float
        } else if FLOAT_VECTOR_REGEX.is_match(value) {
            ValueKind::FloatVector
        } else if TIMECODE_REGEX.is_match(value) {
            ValueKind::Timecode
        } else {
            ValueKind::String
        };
        Some(kind)
    }

    /// Whether `value` is acceptable for this kind. Numeric kinds widen:
    /// an integer is a valid float, and a single float is a valid vector.
    pub fn matches(self, value: &str) -> bool {
        match self {
            ValueKind::Integer => INTEGER_REGEX.is_match(value),
            ValueKind::Float => FLOAT_REGEX.is_match(value),
            ValueKind::FloatVector => FLOAT_REGEX.is_match(value) || FLOAT_VECTOR_REGEX.is_match(value),
            ValueKind::Timecode => TIMECODE_REGEX.is_match(value),
            ValueKind::String => true,
        }
    }

    /// Narrowest kind accepting both.
    pub fn unify(self, other: ValueKind) -> ValueKind {
        use ValueKind::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Integer, Float) | (Float, Integer) => Float,
            (Integer | Float, FloatVector) | (FloatVector, Integer | Float) => FloatVector,
            _ => String,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::FloatVector => "float_vector",
            ValueKind::Timecode => "timecode",
            ValueKind::String => "string",
        }
    }
}

/// Rule for one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRule {
    /// Expected kind; `None` accepts anything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ValueKind>,

    #[serde(default)]
    pub required: bool,

    /// Accept the empty string regardless of `kind`.
    #[serde(default)]
    pub allow_empty: bool,
}

/// Rule for a child element name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildRule {
    #[serde(default)]
    pub min_occurs: usize,

    /// `None` means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_occurs: Option<usize>,

    pub schema: ElementSchema,
}

/// Structure of one element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementSchema {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeRule>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, ChildRule>,

    /// Text content rule; `None` accepts any text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<AttributeRule>,

    /// Tolerate attributes and children the schema does not mention.
    #[serde(default)]
    pub open: bool,
}

/// A schema for whole documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Local name of the root element.
    pub root: String,
    pub element: ElementSchema,
}

impl Schema {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MvnxError::InvalidSchema(e.to_string()))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| MvnxError::InvalidSchema(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_kinds() {
        assert_eq!(ValueKind::detect("23"), Some(ValueKind::Integer));
        assert_eq!(ValueKind::detect("-0.5"), Some(ValueKind::Float));
        assert_eq!(ValueKind::detect("1e-3"), Some(ValueKind::Float));
        assert_eq!(ValueKind::detect("0.1 0.2 -3"), Some(ValueKind::FloatVector));
        assert_eq!(ValueKind::detect("00:00:01:05"), Some(ValueKind::Timecode));
        assert_eq!(ValueKind::detect("00:00:01.250"), Some(ValueKind::Timecode));
        assert_eq!(ValueKind::detect("Pelvis"), Some(ValueKind::String));
        assert_eq!(ValueKind::detect(""), None);
    }

    #[test]
    fn test_numeric_kinds_widen() {
        assert!(ValueKind::Float.matches("3"));
        assert!(ValueKind::FloatVector.matches("3.5"));
        assert!(!ValueKind::Integer.matches("3.5"));
        assert!(!ValueKind::FloatVector.matches("1.0 abc"));
        assert_eq!(ValueKind::Integer.unify(ValueKind::Float), ValueKind::Float);
        assert_eq!(ValueKind::Float.unify(ValueKind::FloatVector), ValueKind::FloatVector);
        assert_eq!(ValueKind::Timecode.unify(ValueKind::Integer), ValueKind::String);
    }

    #[test]
    fn test_schema_json_round_trip() {
        let json = r#"{
            "root": "mvnx",
            "element": {
                "attributes": {"version": {"kind": "integer", "required": true}},
                "children": {"subject": {"min_occurs": 1, "max_occurs": 1, "schema": {"open": true}}}
            }
        }"#;
        let schema = Schema::from_json_str(json).unwrap();
        assert_eq!(schema.root, "mvnx");
        assert!(schema.element.attributes["version"].required);
        assert!(schema.element.children["subject"].schema.open);

        let again = Schema::from_json_str(&schema.to_json_pretty().unwrap()).unwrap();
        assert_eq!(again, schema);
    }

    #[test]
    fn test_invalid_schema_json() {
        let err = Schema::from_json_str(r#"{"element": {}}"#).unwrap_err();
        assert!(matches!(err, MvnxError::InvalidSchema(_)));
    }
}
