//! Frame extraction: metadata, calibration frames and motion frames.

use rayon::prelude::*;
use tracing::debug;

use crate::document::Document;
use crate::error::{MvnxError, Result};
use crate::registry::FieldRegistry;
use crate::types::{FrameInfo, RawRecord, TypedRecord, CONFIG_FRAME_COUNT};

/// Path of the frame container below the root.
const FRAMES_PATH: [&str; 2] = ["subject", "frames"];

/// Project the frame container and every frame, then split off the leading
/// configuration frames.
///
/// The split is purely positional: the first [`CONFIG_FRAME_COUNT`] frames are
/// calibration poses whatever their `type` says.
///
/// # Errors
///
/// Returns an error if the frame container is missing, holds fewer than
/// [`CONFIG_FRAME_COUNT`] frames, or a scalar field fails to project.
pub fn extract_frames(document: &Document, registry: &FieldRegistry) -> Result<FrameInfo> {
    let container = document.root().require(&FRAMES_PATH)?;
    let metadata = registry.project(&RawRecord::from_attributes("frames", container))?;

    let frames = container.children();
    if frames.len() < CONFIG_FRAME_COUNT {
        return Err(MvnxError::TooFewFrames {
            required: CONFIG_FRAME_COUNT,
            actual: frames.len(),
        });
    }

    // Collecting an indexed parallel iterator keeps document order.
    let mut projected: Vec<TypedRecord> = frames
        .par_iter()
        .enumerate()
        .map(|(position, frame)| {
            registry.project(&RawRecord::from_element(format!("frame[{}]", position), frame))
        })
        .collect::<Result<_>>()?;

    let motion_frames = projected.split_off(CONFIG_FRAME_COUNT);
    let config_frames = projected;

    debug!(
        config = config_frames.len(),
        motion = motion_frames.len(),
        "extracted frames"
    );

    Ok(FrameInfo {
        metadata,
        config_frames,
        motion_frames,
    })
}

/// Require the declared `segmentCount` to match the segment table.
pub fn check_segment_count(info: &FrameInfo, segments: usize) -> Result<()> {
    let declared = info
        .segment_count()
        .ok_or_else(|| MvnxError::missing_attribute("segmentCount", "frames"))?;
    if usize::try_from(declared).ok() != Some(segments) {
        return Err(MvnxError::SegmentCountMismatch {
            declared,
            actual: segments,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldValue;

    fn document(frame_count: usize) -> Document {
        let mut xml = String::from(
            r#"<mvnx><subject><frames segmentCount="2" sensorCount="0" jointCount="1">"#,
        );
        let kinds = ["identity", "tpose", "tpose-isb"];
        for i in 0..frame_count {
            let kind = kinds.get(i).copied().unwrap_or("normal");
            xml.push_str(&format!(
                r#"<frame time="{t}" index="{i}" ms="{t}" type="{kind}"><position>0 0 {i}</position></frame>"#,
                t = i * 10,
                i = i,
                kind = kind
            ));
        }
        xml.push_str("</frames></subject></mvnx>");
        Document::parse_str(&xml, None).unwrap()
    }

    #[test]
    fn test_partition_is_positional() {
        let info = extract_frames(&document(10), &FieldRegistry::default()).unwrap();
        assert_eq!(info.config_frames.len(), 3);
        assert_eq!(info.motion_frames.len(), 7);
        assert_eq!(info.segment_count(), Some(2));
        assert_eq!(info.sensor_count(), Some(0));
        assert_eq!(info.joint_count(), Some(1));

        assert_eq!(
            info.config_frames[1].get("type").and_then(FieldValue::as_str),
            Some("tpose")
        );
        let indices: Vec<i64> = info.motion_frames.iter().filter_map(|f| f.int("index")).collect();
        assert_eq!(indices, vec![3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(info.motion_frames[0].floats("position"), Some(&[0.0, 0.0, 3.0][..]));
    }

    #[test]
    fn test_exactly_three_frames_has_no_motion() {
        let info = extract_frames(&document(3), &FieldRegistry::default()).unwrap();
        assert_eq!(info.config_frames.len(), 3);
        assert!(info.motion_frames.is_empty());
    }

    #[test]
    fn test_too_few_frames() {
        let err = extract_frames(&document(2), &FieldRegistry::default()).unwrap_err();
        assert!(matches!(err, MvnxError::TooFewFrames { required: 3, actual: 2 }));
    }

    #[test]
    fn test_malformed_scalar_names_the_frame() {
        let doc = Document::parse_str(
            r#"<mvnx><subject><frames segmentCount="1"><frame ms="0"/><frame ms="1"/><frame ms="2"/><frame ms="x"/></frames></subject></mvnx>"#,
            None,
        )
        .unwrap();
        match extract_frames(&doc, &FieldRegistry::default()).unwrap_err() {
            MvnxError::MalformedField { field, origin, .. } => {
                assert_eq!(field, "ms");
                assert_eq!(origin, "frame[3]");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_container() {
        let doc = Document::parse_str("<mvnx><subject/></mvnx>", None).unwrap();
        let err = extract_frames(&doc, &FieldRegistry::default()).unwrap_err();
        assert!(matches!(err, MvnxError::MissingElement { element: "frames", .. }));
    }

    #[test]
    fn test_segment_count_check() {
        let info = extract_frames(&document(4), &FieldRegistry::default()).unwrap();
        assert!(check_segment_count(&info, 2).is_ok());
        assert!(matches!(
            check_segment_count(&info, 3),
            Err(MvnxError::SegmentCountMismatch { declared: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_missing_segment_count() {
        let doc = Document::parse_str(
            r#"<mvnx><subject><frames sensorCount="0"><frame ms="0"/><frame ms="0"/><frame ms="0"/></frames></subject></mvnx>"#,
            None,
        )
        .unwrap();
        let info = extract_frames(&doc, &FieldRegistry::default()).unwrap();
        assert!(info.segment_count().is_none());

        match check_segment_count(&info, 2).unwrap_err() {
            MvnxError::MissingAttribute { attribute, element } => {
                assert_eq!(attribute, "segmentCount");
                assert_eq!(element, "frames");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
