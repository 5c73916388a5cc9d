//! Plan-driven flattening of motion frames into tables.

use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{MvnxError, Result};
use crate::flatten::plan::{ChannelPlan, FlattenPlan, Layout};
use crate::types::{Cell, FieldValue, FlattenedTable, TypedRecord};

/// Flattens motion frames according to a pre-computed [`FlattenPlan`].
pub struct Flattener {
    plan: FlattenPlan,
}

impl Flattener {
    pub fn new(plan: FlattenPlan) -> Self {
        Flattener { plan }
    }

    pub fn plan(&self) -> &FlattenPlan {
        &self.plan
    }

    /// Build one table per planned channel, keyed by field name.
    ///
    /// Channels are independent and built in parallel; rows always follow frame order.
    pub fn flatten(&self, frames: &[TypedRecord]) -> Result<BTreeMap<String, FlattenedTable>> {
        self.plan
            .channels
            .par_iter()
            .map(|plan| -> Result<(String, FlattenedTable)> {
                let table = flatten_channel(plan, frames)?;
                Ok((table.name.clone(), table))
            })
            .collect()
    }
}

/// Flatten motion frames for the requested fields.
///
/// Every name is checked against the channel vocabulary before the first frame is
/// touched.
///
/// # Errors
///
/// [`MvnxError::UnsupportedField`] for an unknown name; per-frame errors
/// ([`MvnxError::MissingFrameField`], [`MvnxError::NonNumericField`],
/// [`MvnxError::FieldShape`]) abort the whole call.
pub fn flatten<S: AsRef<str>>(
    frames: &[TypedRecord],
    segments: &[String],
    joints: &[String],
    requested: &[S],
) -> Result<BTreeMap<String, FlattenedTable>> {
    let plan = FlattenPlan::from_names(requested, segments, joints)?;
    Flattener::new(plan).flatten(frames)
}

fn flatten_channel(plan: &ChannelPlan, frames: &[TypedRecord]) -> Result<FlattenedTable> {
    let field = plan.channel.field_name();
    let rows = frames
        .iter()
        .enumerate()
        .map(|(position, frame)| flatten_row(plan, frame, position))
        .collect::<Result<Vec<_>>>()?;

    debug!(field, rows = rows.len(), columns = plan.header.len(), "flattened channel");
    Ok(FlattenedTable {
        name: field.to_string(),
        header: plan.header.clone(),
        rows,
    })
}

fn flatten_row(plan: &ChannelPlan, frame: &TypedRecord, position: usize) -> Result<Vec<Cell>> {
    let index = frame_int(frame, "index", position)?;
    let ms = frame_int(frame, "ms", position)?;
    let mut row = Vec::with_capacity(plan.header.len());
    row.push(Cell::Int(index));
    row.push(Cell::Int(ms));

    let field = plan.channel.field_name();
    match plan.channel.layout() {
        Layout::Timestamp => {}
        Layout::PerSegment(_) | Layout::PerJoint(_) | Layout::Fixed(_) => {
            let values = match require_field(frame, field, position)? {
                FieldValue::FloatVec(values) => values,
                _ => {
                    return Err(MvnxError::NonNumericField {
                        field: field.to_string(),
                        frame: index,
                    })
                }
            };
            check_width(plan, values.len(), index)?;
            row.extend(values.iter().map(|&v| Cell::Float(v)));
        }
        Layout::Flags(_) => {
            let flags = parse_flags(require_field(frame, field, position)?)
                .ok_or_else(|| MvnxError::NonNumericField {
                    field: field.to_string(),
                    frame: index,
                })?;
            check_width(plan, flags.len(), index)?;
            row.extend(flags.into_iter().map(Cell::Bool));
        }
    }
    Ok(row)
}

fn frame_int(frame: &TypedRecord, field: &str, position: usize) -> Result<i64> {
    match require_field(frame, field, position)? {
        FieldValue::Int(value) => Ok(*value),
        other => Err(MvnxError::malformed_field(
            field,
            format!("{:?}", other),
            "integer",
            format!("motion frame {}", position),
        )),
    }
}

fn require_field<'a>(frame: &'a TypedRecord, field: &str, position: usize) -> Result<&'a FieldValue> {
    frame.get(field).ok_or_else(|| MvnxError::MissingFrameField {
        field: field.to_string(),
        position,
    })
}

fn check_width(plan: &ChannelPlan, actual: usize, frame: i64) -> Result<()> {
    if actual != plan.width {
        return Err(MvnxError::field_shape(
            plan.channel.field_name(),
            frame,
            plan.width,
            actual,
        ));
    }
    Ok(())
}

/// Whitespace-separated numbers, nonzero meaning on. Accepts values already
/// projected as float vectors too.
fn parse_flags(value: &FieldValue) -> Option<Vec<bool>> {
    let text = match value {
        FieldValue::FloatVec(values) => return Some(values.iter().map(|&v| v != 0.0).collect()),
        FieldValue::Int(i) => return Some(vec![*i != 0]),
        FieldValue::Str(s) => s.as_str(),
        FieldValue::Raw(raw) => raw.text()?,
    };
    text.split_whitespace()
        .map(|t| t.parse::<f64>().ok().map(|v| v != 0.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Element;
    use crate::types::RawValue;

    fn frame(index: i64, ms: i64, fields: Vec<(&str, FieldValue)>) -> TypedRecord {
        let mut record = TypedRecord::default();
        record.fields.insert("index".to_string(), FieldValue::Int(index));
        record.fields.insert("ms".to_string(), FieldValue::Int(ms));
        for (k, v) in fields {
            record.fields.insert(k.to_string(), v);
        }
        record
    }

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_position_table() {
        let frames = vec![
            frame(3, 50, vec![("position", FieldValue::FloatVec(vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0]))]),
            frame(4, 58, vec![("position", FieldValue::FloatVec(vec![0.5, 0.0, 0.0, 1.5, 2.0, 3.0]))]),
        ];
        let tables = flatten(&frames, &labels(&["Pelvis", "Head"]), &[], &["position"]).unwrap();

        assert_eq!(tables.len(), 1);
        let table = &tables["position"];
        assert_eq!(table.column_count(), 2 + 3 * 2);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(
            table.rows[0],
            vec![
                Cell::Int(3),
                Cell::Int(50),
                Cell::Float(0.0),
                Cell::Float(0.0),
                Cell::Float(0.0),
                Cell::Float(1.0),
                Cell::Float(2.0),
                Cell::Float(3.0)
            ]
        );
        assert_eq!(table.rows[1][0], Cell::Int(4));
    }

    #[test]
    fn test_shape_mismatch_is_fatal() {
        let frames = vec![frame(3, 0, vec![("position", FieldValue::FloatVec(vec![1.0; 5]))])];
        match flatten(&frames, &labels(&["Pelvis", "Head"]), &[], &["position"]).unwrap_err() {
            MvnxError::FieldShape { field, frame, expected, actual } => {
                assert_eq!(field, "position");
                assert_eq!(frame, 3);
                assert_eq!(expected, 6);
                assert_eq!(actual, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unsupported_field_before_any_row() {
        // The frame would fail shape checks; the bad name must be reported instead.
        let frames = vec![frame(3, 0, vec![("position", FieldValue::FloatVec(vec![]))])];
        let err = flatten(&frames, &labels(&["Pelvis"]), &[], &["position", "heartRate"]).unwrap_err();
        assert!(matches!(err, MvnxError::UnsupportedField(name) if name == "heartRate"));
    }

    #[test]
    fn test_foot_contacts_from_raw_text() {
        let node = Element::new("footContacts").with_text("1 0 0 1");
        let frames = vec![frame(3, 0, vec![("footContacts", FieldValue::Raw(RawValue::Node(node)))])];
        let tables = flatten(&frames, &[], &[], &["footContacts"]).unwrap();
        assert_eq!(
            tables["footContacts"].rows[0][2..],
            [Cell::Bool(true), Cell::Bool(false), Cell::Bool(false), Cell::Bool(true)]
        );
    }

    #[test]
    fn test_center_of_mass_and_joint_angles() {
        let frames = vec![frame(
            3,
            0,
            vec![
                ("centerOfMass", FieldValue::FloatVec(vec![0.1, 0.2, 0.9])),
                ("jointAngle", FieldValue::FloatVec(vec![1.0, 2.0, 3.0])),
            ],
        )];
        let tables = flatten(
            &frames,
            &labels(&["Pelvis"]),
            &labels(&["jNeck"]),
            &["centerOfMass", "jointAngle", "ms"],
        )
        .unwrap();

        assert_eq!(tables.len(), 3);
        assert_eq!(tables["centerOfMass"].header[2..], ["com_x", "com_y", "com_z"]);
        assert_eq!(tables["jointAngle"].header[2..], ["jNeck_x", "jNeck_y", "jNeck_z"]);
        assert_eq!(tables["ms"].rows[0], vec![Cell::Int(3), Cell::Int(0)]);
    }

    #[test]
    fn test_missing_and_unconverted_fields() {
        let frames = vec![frame(3, 0, vec![])];
        assert!(matches!(
            flatten(&frames, &labels(&["Pelvis"]), &[], &["velocity"]),
            Err(MvnxError::MissingFrameField { position: 0, .. })
        ));

        let raw = FieldValue::Raw(RawValue::Text("1.0 abc 2.0".to_string()));
        let frames = vec![frame(7, 0, vec![("velocity", raw)])];
        assert!(matches!(
            flatten(&frames, &labels(&["Pelvis"]), &[], &["velocity"]),
            Err(MvnxError::NonNumericField { frame: 7, .. })
        ));
    }

    #[test]
    fn test_no_motion_frames_gives_header_only() {
        let tables = flatten(&[], &labels(&["Pelvis"]), &[], &["orientation"]).unwrap();
        assert_eq!(tables["orientation"].header.len(), 6);
        assert!(tables["orientation"].rows.is_empty());
    }
}
