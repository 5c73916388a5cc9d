//! Error types for MVNX loading, extraction and flattening.

use thiserror::Error;

/// Errors that can occur while loading or extracting an MVNX recording.
#[derive(Debug, Error)]
pub enum MvnxError {
    /// Malformed markup.
    #[error("XML parse error: {0}")]
    Xml(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document did not pass schema validation.
    #[error("document failed schema validation with {} violation(s): {}", .violations.len(), .violations.first().map(String::as_str).unwrap_or("<none>"))]
    SchemaValidation {
        /// Every violation found, in document order.
        violations: Vec<String>,
    },

    /// A schema file could not be read as a schema.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// A field registry declares a name in more than one category, or could not be read.
    #[error("invalid field registry: {0}")]
    InvalidRegistry(String),

    /// Missing required element.
    #[error("missing required element: {element} in {context}")]
    MissingElement {
        /// The missing element name.
        element: &'static str,
        /// Where the element was expected.
        context: String,
    },

    /// Missing required attribute.
    #[error("missing required attribute: {attribute} on {element}")]
    MissingAttribute {
        /// The missing attribute name.
        attribute: &'static str,
        /// The element that should have the attribute.
        element: String,
    },

    /// A scalar field could not be coerced to its registered type.
    #[error("malformed field {field} in {origin}: expected {expected}, found {value:?}")]
    MalformedField {
        /// The field name.
        field: String,
        /// The offending raw text.
        value: String,
        /// The registered type.
        expected: &'static str,
        /// The record the field belongs to, e.g. `frame[4]`.
        origin: String,
    },

    /// Segment ids do not match their document position.
    #[error("segments aren't ordered by id: position {position} holds id {id:?} ({label})")]
    UnorderedSegments {
        /// 1-based document position.
        position: usize,
        /// The id attribute found at that position.
        id: String,
        /// The segment label at that position.
        label: String,
    },

    /// A joint connector names a segment that is not in the segment table.
    #[error("joint {joint} references unknown segment {segment}")]
    UnknownSegmentReference {
        /// The unresolved segment label.
        segment: String,
        /// The joint holding the connector.
        joint: String,
    },

    /// Two segments share one label.
    #[error("duplicate segment label {label}")]
    DuplicateSegment {
        /// The repeated label.
        label: String,
    },

    /// A joint connector names a point that its segment does not define.
    #[error("joint {joint} references unknown point {point} on segment {segment}")]
    UnknownPointReference {
        /// The unresolved point label.
        point: String,
        /// The segment the point was looked up on.
        segment: String,
        /// The joint holding the connector.
        joint: String,
    },

    /// A connector text is not of the form `segment/point`.
    #[error("malformed connector {value:?} on joint {joint}")]
    MalformedConnector {
        /// The joint holding the connector.
        joint: String,
        /// The raw connector text.
        value: String,
    },

    /// Declared segment count disagrees with the segment table.
    #[error("inconsistent segmentCount: frames declare {declared}, skeleton has {actual}")]
    SegmentCountMismatch {
        /// The `segmentCount` frame metadata.
        declared: i64,
        /// Number of extracted segments.
        actual: usize,
    },

    /// The recording has fewer frames than the leading configuration frames.
    #[error("expected at least {required} frames (configuration frames), found {actual}")]
    TooFewFrames {
        /// Minimum number of frames.
        required: usize,
        /// Frames found.
        actual: usize,
    },

    /// A flattening request names a field outside the allowed vocabulary.
    #[error("unsupported field: {0}")]
    UnsupportedField(String),

    /// A motion frame lacks a requested field.
    #[error("frame at position {position} has no {field} field")]
    MissingFrameField {
        /// The requested field.
        field: String,
        /// Position of the frame among the motion frames.
        position: usize,
    },

    /// A requested field was left unconverted and cannot be flattened.
    #[error("field {field} of frame {frame} is not numeric")]
    NonNumericField {
        /// The requested field.
        field: String,
        /// The frame index.
        frame: i64,
    },

    /// A per-frame vector does not match the skeleton layout.
    #[error("field {field} of frame {frame} has {actual} values, expected {expected}")]
    FieldShape {
        /// The requested field.
        field: String,
        /// The frame index.
        frame: i64,
        /// Entity count times dimensionality.
        expected: usize,
        /// Values found.
        actual: usize,
    },
}

impl MvnxError {
    /// Create a missing element error.
    pub fn missing_element(element: &'static str, context: impl Into<String>) -> Self {
        Self::MissingElement {
            element,
            context: context.into(),
        }
    }

    /// Create a missing attribute error.
    pub fn missing_attribute(attribute: &'static str, element: impl Into<String>) -> Self {
        Self::MissingAttribute {
            attribute,
            element: element.into(),
        }
    }

    /// Create a malformed field error.
    pub fn malformed_field(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: &'static str,
        origin: impl Into<String>,
    ) -> Self {
        Self::MalformedField {
            field: field.into(),
            value: value.into(),
            expected,
            origin: origin.into(),
        }
    }

    /// Create an unknown segment reference error.
    pub fn unknown_segment(segment: impl Into<String>, joint: impl Into<String>) -> Self {
        Self::UnknownSegmentReference {
            segment: segment.into(),
            joint: joint.into(),
        }
    }

    /// Create a duplicate segment error.
    pub fn duplicate_segment(label: impl Into<String>) -> Self {
        Self::DuplicateSegment {
            label: label.into(),
        }
    }

    /// The error message with every schema violation on its own line.
    ///
    /// `Display` only names the first violation; other errors read the same either way.
    pub fn report(&self) -> String {
        match self {
            Self::SchemaValidation { violations } => {
                let mut report = format!(
                    "document failed schema validation with {} violation(s):",
                    violations.len()
                );
                for violation in violations {
                    report.push_str("\n  ");
                    report.push_str(violation);
                }
                report
            }
            other => other.to_string(),
        }
    }

    /// Create a field shape error.
    pub fn field_shape(field: impl Into<String>, frame: i64, expected: usize, actual: usize) -> Self {
        Self::FieldShape {
            field: field.into(),
            frame,
            expected,
            actual,
        }
    }
}

/// Result type for MVNX operations.
pub type Result<T> = std::result::Result<T, MvnxError>;
