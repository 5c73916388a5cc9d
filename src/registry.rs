//! Field registry and typed projection.
//!
//! MVNX stores everything as text. The registry says which field names carry strings,
//! integers or whitespace-separated float vectors; [`FieldRegistry::project`] turns a
//! [`RawRecord`] into a [`TypedRecord`] accordingly. Fields the registry does not know
//! pass through untouched.
//!
//! Scalars and vectors fail differently: a bad integer aborts the record, a bad vector
//! is reported and kept in its raw form so one damaged channel does not sink a whole
//! recording.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::warn;

use crate::error::{MvnxError, Result};
use crate::types::{FieldValue, RawRecord, RawValue, TypedRecord};

/// Type category of a registered field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCategory {
    Str,
    Int,
    FloatVec,
}

/// Disjoint sets of field names per type category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RegistrySpec")]
pub struct FieldRegistry {
    strings: BTreeSet<String>,
    integers: BTreeSet<String>,
    float_vectors: BTreeSet<String>,
}

/// Unchecked registry as read from a file.
#[derive(Debug, Deserialize)]
struct RegistrySpec {
    #[serde(default)]
    strings: BTreeSet<String>,
    #[serde(default)]
    integers: BTreeSet<String>,
    #[serde(default)]
    float_vectors: BTreeSet<String>,
}

impl TryFrom<RegistrySpec> for FieldRegistry {
    type Error = MvnxError;

    fn try_from(spec: RegistrySpec) -> Result<Self> {
        FieldRegistry::new(spec.strings, spec.integers, spec.float_vectors)
    }
}

impl FieldRegistry {
    /// Build a registry, rejecting names registered under more than one category.
    pub fn new<S, I, F>(strings: S, integers: I, float_vectors: F) -> Result<Self>
    where
        S: IntoIterator,
        S::Item: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        let registry = FieldRegistry {
            strings: strings.into_iter().map(Into::into).collect(),
            integers: integers.into_iter().map(Into::into).collect(),
            float_vectors: float_vectors.into_iter().map(Into::into).collect(),
        };

        let overlap: Vec<&String> = registry
            .strings
            .intersection(&registry.integers)
            .chain(registry.strings.intersection(&registry.float_vectors))
            .chain(registry.integers.intersection(&registry.float_vectors))
            .collect();
        if !overlap.is_empty() {
            return Err(MvnxError::InvalidRegistry(format!(
                "fields registered under more than one type: {:?}",
                overlap
            )));
        }

        Ok(registry)
    }

    /// Read a registry from a JSON file of the form
    /// `{"strings": [..], "integers": [..], "float_vectors": [..]}`.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MvnxError::InvalidRegistry(e.to_string()))
    }

    /// Category of a field name, `None` for passthrough fields.
    pub fn category(&self, field: &str) -> Option<FieldCategory> {
        if self.strings.contains(field) {
            Some(FieldCategory::Str)
        } else if self.integers.contains(field) {
            Some(FieldCategory::Int)
        } else if self.float_vectors.contains(field) {
            Some(FieldCategory::FloatVec)
        } else {
            None
        }
    }

    /// Project a raw record into a typed one. Keys are kept as they are.
    ///
    /// # Errors
    ///
    /// Returns [`MvnxError::MalformedField`] if an integer field does not hold a
    /// base-10 integer. Float vectors never fail; see the module documentation.
    pub fn project(&self, record: &RawRecord) -> Result<TypedRecord> {
        let mut typed = TypedRecord::default();
        for (key, raw) in &record.fields {
            let value = match self.category(key) {
                Some(FieldCategory::Str) => FieldValue::Str(raw.text().unwrap_or("").to_string()),
                Some(FieldCategory::Int) => {
                    let text = raw.text().unwrap_or("");
                    let parsed = text.trim().parse::<i64>().map_err(|_| {
                        MvnxError::malformed_field(key, text, "integer", &record.origin)
                    })?;
                    FieldValue::Int(parsed)
                }
                Some(FieldCategory::FloatVec) => match parse_float_vec(raw) {
                    Ok(values) => FieldValue::FloatVec(values),
                    Err(reason) => {
                        warn!(
                            field = key.as_str(),
                            origin = record.origin.as_str(),
                            %reason,
                            "could not convert to vector, keeping raw value"
                        );
                        FieldValue::Raw(raw.clone())
                    }
                },
                None => FieldValue::Raw(raw.clone()),
            };
            typed.fields.insert(key.clone(), value);
        }
        Ok(typed)
    }
}

impl Default for FieldRegistry {
    /// The MVNX 4 field vocabulary.
    fn default() -> Self {
        FieldRegistry {
            strings: ["tc", "type"].iter().map(|s| s.to_string()).collect(),
            integers: ["segmentCount", "sensorCount", "jointCount", "time", "index", "ms"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            float_vectors: [
                "orientation",
                "position",
                "velocity",
                "acceleration",
                "angularVelocity",
                "angularAcceleration",
                "sensorFreeAcceleration",
                "sensorMagneticField",
                "sensorOrientation",
                "jointAngle",
                "jointAngleXZY",
                "jointAngleErgo",
                "centerOfMass",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Split on single spaces and parse every token; the first bad token is the error.
fn parse_float_vec(raw: &RawValue) -> std::result::Result<Vec<f64>, String> {
    let text = raw.text().ok_or_else(|| "no text content".to_string())?;
    text.trim()
        .split(' ')
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|e| format!("{:?}: {}", token, e))
        })
        .collect()
}
