//! Skeleton extraction: segments, joints and their resolution.

use std::collections::HashMap;
use tracing::debug;

use crate::document::{Document, Element};
use crate::error::{MvnxError, Result};
use crate::types::{Connector, Joint, Keypoint, Segment};

const SEGMENTS_PATH: [&str; 2] = ["subject", "segments"];
const JOINTS_PATH: [&str; 2] = ["subject", "joints"];

/// Segment labels in id order.
///
/// Segments must already be stored in id order starting at 1; they are never
/// re-sorted, since flattened column order follows document order.
///
/// # Errors
///
/// Returns [`MvnxError::UnorderedSegments`] at the first segment whose `id` differs
/// from its 1-based position.
pub fn extract_segments(document: &Document) -> Result<Vec<String>> {
    let container = document.root().require(&SEGMENTS_PATH)?;
    container
        .children()
        .iter()
        .enumerate()
        .map(|(i, segment)| check_segment_position(segment, i + 1).map(str::to_string))
        .collect()
}

/// Joints in document order, with connectors split into segment and point.
///
/// Connectors are not checked against the segment table here; see
/// [`extract_skeleton`].
pub fn extract_joints(document: &Document) -> Result<Vec<Joint>> {
    let container = document.root().require(&JOINTS_PATH)?;
    container.children().iter().map(parse_joint).collect()
}

/// Returns the segment label if `id` matches `position`.
fn check_segment_position(segment: &Element, position: usize) -> Result<&str> {
    let label = segment
        .attribute("label")
        .ok_or_else(|| MvnxError::missing_attribute("label", "segment"))?;
    let id = segment.attribute("id").unwrap_or("");
    if id != position.to_string() {
        return Err(MvnxError::UnorderedSegments {
            position,
            id: id.to_string(),
            label: label.to_string(),
        });
    }
    Ok(label)
}

fn parse_joint(joint: &Element) -> Result<Joint> {
    let label = joint
        .attribute("label")
        .ok_or_else(|| MvnxError::missing_attribute("label", "joint"))?;
    let from = parse_connector(joint, label, "connector1")?;
    let to = parse_connector(joint, label, "connector2")?;
    Ok(Joint {
        label: label.to_string(),
        from,
        to,
    })
}

fn parse_connector(joint: &Element, label: &str, name: &'static str) -> Result<Connector> {
    let text = joint
        .child(name)
        .and_then(Element::text)
        .ok_or_else(|| MvnxError::missing_element(name, format!("joint {}", label)))?;

    match text.trim().split('/').collect::<Vec<_>>().as_slice() {
        [segment, point] => Ok(Connector {
            segment: segment.to_string(),
            point: point.to_string(),
        }),
        _ => Err(MvnxError::MalformedConnector {
            joint: label.to_string(),
            value: text.to_string(),
        }),
    }
}

/// A joint whose connectors were resolved to segment positions.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedJoint {
    pub joint: Joint,
    /// Index into [`Skeleton::segments`] of the first connector.
    pub from_segment: usize,
    /// Index into [`Skeleton::segments`] of the second connector.
    pub to_segment: usize,
}

/// Segments with their keypoints plus resolved joints.
#[derive(Debug, Clone)]
pub struct Skeleton {
    segments: Vec<Segment>,
    joints: Vec<ResolvedJoint>,
    index: HashMap<String, usize>,
}

impl Skeleton {
    /// Build a skeleton, resolving every connector through a label index.
    ///
    /// # Errors
    ///
    /// [`MvnxError::DuplicateSegment`] if two segments share a label,
    /// [`MvnxError::UnknownSegmentReference`] if a connector names a segment that does
    /// not exist, [`MvnxError::UnknownPointReference`] if the segment exists but lacks
    /// the point.
    pub fn new(segments: Vec<Segment>, joints: Vec<Joint>) -> Result<Self> {
        let mut index = HashMap::with_capacity(segments.len());
        for (i, segment) in segments.iter().enumerate() {
            if index.insert(segment.label.clone(), i).is_some() {
                return Err(MvnxError::duplicate_segment(&segment.label));
            }
        }

        let mut skeleton = Skeleton {
            segments,
            joints: Vec::with_capacity(joints.len()),
            index,
        };
        for joint in joints {
            let from_segment = skeleton.resolve(&joint.from, &joint.label)?;
            let to_segment = skeleton.resolve(&joint.to, &joint.label)?;
            skeleton.joints.push(ResolvedJoint {
                joint,
                from_segment,
                to_segment,
            });
        }
        Ok(skeleton)
    }

    /// Segments in id order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Joints in document order.
    pub fn joints(&self) -> &[ResolvedJoint] {
        &self.joints
    }

    /// Look a segment up by label.
    pub fn segment(&self, label: &str) -> Option<&Segment> {
        self.index.get(label).map(|&i| &self.segments[i])
    }

    /// Position of the connector's segment, checking the point exists on it.
    fn resolve(&self, connector: &Connector, joint: &str) -> Result<usize> {
        let &i = self
            .index
            .get(&connector.segment)
            .ok_or_else(|| MvnxError::unknown_segment(&connector.segment, joint))?;
        if self.segments[i].point(&connector.point).is_none() {
            return Err(MvnxError::UnknownPointReference {
                point: connector.point.clone(),
                segment: connector.segment.clone(),
                joint: joint.to_string(),
            });
        }
        Ok(i)
    }

    /// Body-frame position of the point a connector refers to.
    pub fn connector_position(&self, connector: &Connector) -> Option<[f64; 3]> {
        self.segment(&connector.segment)?
            .point(&connector.point)
            .map(|p| p.position)
    }

    pub fn segment_labels(&self) -> Vec<String> {
        self.segments.iter().map(|s| s.label.clone()).collect()
    }

    pub fn joint_labels(&self) -> Vec<String> {
        self.joints.iter().map(|j| j.joint.label.clone()).collect()
    }
}

/// Extract the full skeleton: segments with their keypoints and resolved joints.
pub fn extract_skeleton(document: &Document) -> Result<Skeleton> {
    let container = document.root().require(&SEGMENTS_PATH)?;
    let segments = container
        .children()
        .iter()
        .enumerate()
        .map(|(i, element)| parse_segment(element, i + 1))
        .collect::<Result<Vec<_>>>()?;
    let joints = extract_joints(document)?;

    debug!(
        segments = segments.len(),
        joints = joints.len(),
        "extracted skeleton"
    );
    Skeleton::new(segments, joints)
}

fn parse_segment(element: &Element, position: usize) -> Result<Segment> {
    let label = check_segment_position(element, position)?.to_string();
    let mut points = Vec::new();
    if let Some(container) = element.child("points") {
        for point in container.children() {
            points.push(parse_point(point, &label)?);
        }
    }
    Ok(Segment {
        id: position,
        label,
        points,
    })
}

fn parse_point(point: &Element, segment: &str) -> Result<Keypoint> {
    let label = point
        .attribute("label")
        .ok_or_else(|| MvnxError::missing_attribute("label", format!("point of {}", segment)))?;
    let origin = format!("{}/{}", segment, label);
    let text = point
        .child("pos_b")
        .and_then(Element::text)
        .ok_or_else(|| MvnxError::missing_element("pos_b", origin.clone()))?;

    let values = text
        .split_whitespace()
        .map(|t| t.parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| MvnxError::malformed_field("pos_b", text, "3 floats", origin.as_str()))?;
    match values.as_slice() {
        &[x, y, z] => Ok(Keypoint {
            label: label.to_string(),
            position: [x, y, z],
        }),
        _ => Err(MvnxError::malformed_field("pos_b", text, "3 floats", origin)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment_xml(id: &str, label: &str, points: &[&str]) -> String {
        let points: String = points
            .iter()
            .map(|p| format!(r#"<point label="{}"><pos_b>0.1 0.2 0.3</pos_b></point>"#, p))
            .collect();
        format!(
            r#"<segment id="{}" label="{}"><points>{}</points></segment>"#,
            id, label, points
        )
    }

    fn document(segments: &[String], joints: &str) -> Document {
        let xml = format!(
            "<mvnx><subject><segments>{}</segments><joints>{}</joints></subject></mvnx>",
            segments.concat(),
            joints
        );
        Document::parse_str(&xml, None).unwrap()
    }

    const NECK: &str = "<joint label=\"Neck\"><connector1>Pelvis/top</connector1><connector2>Head/base</connector2></joint>";

    #[test]
    fn test_segments_in_id_order() {
        let doc = document(
            &[
                segment_xml("1", "Pelvis", &["top"]),
                segment_xml("2", "L5", &[]),
                segment_xml("3", "Head", &["base"]),
            ],
            "",
        );
        assert_eq!(extract_segments(&doc).unwrap(), vec!["Pelvis", "L5", "Head"]);
    }

    #[test]
    fn test_permuted_segments_fail() {
        let doc = document(
            &[segment_xml("2", "Head", &[]), segment_xml("1", "Pelvis", &[])],
            "",
        );
        match extract_segments(&doc).unwrap_err() {
            MvnxError::UnorderedSegments { position, id, label } => {
                assert_eq!(position, 1);
                assert_eq!(id, "2");
                assert_eq!(label, "Head");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_gap_in_ids_fails() {
        let doc = document(
            &[segment_xml("1", "Pelvis", &[]), segment_xml("3", "Head", &[])],
            "",
        );
        assert!(matches!(
            extract_segments(&doc),
            Err(MvnxError::UnorderedSegments { position: 2, .. })
        ));
    }

    #[test]
    fn test_joints_split_connectors() {
        let doc = document(&[], NECK);
        let joints = extract_joints(&doc).unwrap();
        assert_eq!(joints.len(), 1);
        assert_eq!(joints[0].label, "Neck");
        assert_eq!(joints[0].from.segment, "Pelvis");
        assert_eq!(joints[0].from.point, "top");
        assert_eq!(joints[0].to.segment, "Head");
        assert_eq!(joints[0].to.point, "base");
    }

    #[test]
    fn test_malformed_connector() {
        let doc = document(
            &[],
            "<joint label=\"J\"><connector1>Pelvis</connector1><connector2>a/b/c</connector2></joint>",
        );
        assert!(matches!(
            extract_joints(&doc),
            Err(MvnxError::MalformedConnector { .. })
        ));
    }

    #[test]
    fn test_skeleton_resolves_connectors() {
        let doc = document(
            &[segment_xml("1", "Pelvis", &["top"]), segment_xml("2", "Head", &["base"])],
            NECK,
        );
        let skeleton = extract_skeleton(&doc).unwrap();
        assert_eq!(skeleton.segment_labels(), vec!["Pelvis", "Head"]);
        assert_eq!(skeleton.joint_labels(), vec!["Neck"]);
        assert_eq!(skeleton.joints()[0].from_segment, 0);
        assert_eq!(skeleton.joints()[0].to_segment, 1);
        assert_eq!(skeleton.segments()[1].id, 2);
        assert_eq!(
            skeleton.connector_position(&skeleton.joints()[0].joint.to),
            Some([0.1, 0.2, 0.3])
        );
    }

    #[test]
    fn test_unknown_segment_reference() {
        let doc = document(&[segment_xml("1", "Pelvis", &["top"])], NECK);
        match extract_skeleton(&doc).unwrap_err() {
            MvnxError::UnknownSegmentReference { segment, joint } => {
                assert_eq!(segment, "Head");
                assert_eq!(joint, "Neck");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_point_reference() {
        let doc = document(
            &[segment_xml("1", "Pelvis", &["top"]), segment_xml("2", "Head", &["crown"])],
            NECK,
        );
        assert!(matches!(
            extract_skeleton(&doc),
            Err(MvnxError::UnknownPointReference { .. })
        ));
    }

    #[test]
    fn test_duplicate_segment_labels_rejected() {
        let doc = document(
            &[segment_xml("1", "Pelvis", &["top"]), segment_xml("2", "Pelvis", &["base"])],
            "",
        );
        match extract_skeleton(&doc).unwrap_err() {
            MvnxError::DuplicateSegment { label } => assert_eq!(label, "Pelvis"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
