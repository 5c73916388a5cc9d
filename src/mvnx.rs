//! One recording, loaded once and queried many times.

use chrono::Local;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::document::{provenance_annotation, write_document, Document};
use crate::error::Result;
use crate::extract::{self, Skeleton};
use crate::flatten::{Channel, FlattenPlan, Flattener};
use crate::registry::FieldRegistry;
use crate::schema::Schema;
use crate::types::{FlattenedTable, FrameInfo, Joint};

/// Configuration for extraction and export
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Field classification used for every projection
    pub registry: FieldRegistry,

    /// Indent exported markup
    pub pretty_export: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        ExtractConfig {
            registry: FieldRegistry::default(),
            pretty_export: true,
        }
    }
}

/// A loaded MVNX recording.
///
/// ```no_run
/// use mvnx::Mvnx;
///
/// # fn main() -> mvnx::Result<()> {
/// let recording = Mvnx::open("session.mvnx", None)?;
/// let tables = recording.flatten(&["position", "jointAngle"])?;
/// println!("{} position rows", tables["position"].rows.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Mvnx {
    document: Document,
    config: ExtractConfig,
}

impl Mvnx {
    /// Load a recording from disk, validating it first when a schema is given.
    pub fn open<P: AsRef<Path>>(path: P, schema: Option<&Schema>) -> Result<Self> {
        Ok(Self::from_document(Document::open(path, schema)?))
    }

    /// Parse a recording held in memory.
    pub fn parse_str(xml: &str, schema: Option<&Schema>) -> Result<Self> {
        Ok(Self::from_document(Document::parse_str(xml, schema)?))
    }

    pub fn from_document(document: Document) -> Self {
        Mvnx {
            document,
            config: ExtractConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExtractConfig) -> Self {
        self.config = config;
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Frame metadata and frames, with `segmentCount` checked against the segment table.
    pub fn extract_frame_info(&self) -> Result<FrameInfo> {
        self.frames_and_segments().map(|(info, _)| info)
    }

    /// Checked frame info together with the segment labels it was checked against.
    fn frames_and_segments(&self) -> Result<(FrameInfo, Vec<String>)> {
        let info = extract::extract_frames(&self.document, &self.config.registry)?;
        let segments = extract::extract_segments(&self.document)?;
        extract::check_segment_count(&info, segments.len())?;
        Ok((info, segments))
    }

    pub fn extract_segments(&self) -> Result<Vec<String>> {
        extract::extract_segments(&self.document)
    }

    pub fn extract_joints(&self) -> Result<Vec<Joint>> {
        extract::extract_joints(&self.document)
    }

    pub fn extract_skeleton(&self) -> Result<Skeleton> {
        extract::extract_skeleton(&self.document)
    }

    /// Flatten the motion frames for every requested field.
    ///
    /// Unknown names are rejected before the document is walked.
    pub fn flatten<S: AsRef<str>>(&self, fields: &[S]) -> Result<BTreeMap<String, FlattenedTable>> {
        let channels = Channel::parse_all(fields)?;
        let (info, segments) = self.frames_and_segments()?;
        let joints: Vec<String> = self
            .extract_joints()?
            .into_iter()
            .map(|joint| joint.label)
            .collect();

        let plan = FlattenPlan::new(&channels, &segments, &joints);
        Flattener::new(plan).flatten(&info.motion_frames)
    }

    /// Channels that have data in this recording, judged by the first motion frame.
    ///
    /// A recording without motion frames only offers `ms`.
    pub fn available_channels(&self) -> Result<Vec<Channel>> {
        let info = self.extract_frame_info()?;
        let channels = match info.motion_frames.first() {
            Some(frame) => Channel::ALL
                .iter()
                .copied()
                .filter(|c| *c == Channel::Ms || frame.contains(c.field_name()))
                .collect(),
            None => vec![Channel::Ms],
        };
        Ok(channels)
    }

    /// Write the document back out with a provenance note on the root element.
    pub fn export<P: AsRef<Path>>(&self, path: P, extra: &str) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.export_to(&mut writer, extra)?;
        writer.flush()?;
        info!(path = %path.display(), "exported MVNX document");
        Ok(())
    }

    pub fn export_to<W: Write>(&self, writer: W, extra: &str) -> Result<()> {
        let annotation = provenance_annotation(Local::now(), extra);
        write_document(&self.document, writer, &annotation, self.config.pretty_export)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MvnxError;
    use crate::types::Cell;

    const RECORDING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mvnx xmlns="http://www.xsens.com/mvn/mvnx" version="4">
  <subject label="demo">
    <segments>
      <segment label="Pelvis" id="1"/>
      <segment label="Head" id="2"/>
    </segments>
    <joints>
      <joint label="jNeck">
        <connector1>Pelvis/jL5S1</connector1>
        <connector2>Head/jC1Head</connector2>
      </joint>
    </joints>
    <frames segmentCount="2" sensorCount="0" jointCount="1">
      <frame time="0" index="" tc="00:00:00:00" ms="0" type="identity"/>
      <frame time="0" index="" tc="00:00:00:00" ms="0" type="tpose"/>
      <frame time="0" index="" tc="00:00:00:00" ms="0" type="tpose-isb"/>
      <frame time="0" index="3" tc="00:00:00:01" ms="50" type="normal">
        <position>0 0 0 1 2 3</position>
        <jointAngle>10 20 30</jointAngle>
      </frame>
    </frames>
  </subject>
</mvnx>"#;

    #[test]
    fn test_empty_config_frame_index_is_malformed() {
        let recording = Mvnx::parse_str(RECORDING, None).unwrap();
        match recording.flatten(&["position"]).unwrap_err() {
            MvnxError::MalformedField { field, origin, .. } => {
                assert_eq!(field, "index");
                assert!(origin.starts_with("frame["));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    fn fixed_recording() -> Mvnx {
        Mvnx::parse_str(&RECORDING.replace(r#"index="""#, r#"index="0""#), None).unwrap()
    }

    #[test]
    fn test_flatten_through_facade() {
        let tables = fixed_recording().flatten(&["position", "jointAngle"]).unwrap();

        let position = &tables["position"];
        assert_eq!(position.header[2..], ["Pelvis_x", "Pelvis_y", "Pelvis_z", "Head_x", "Head_y", "Head_z"]);
        assert_eq!(position.rows[0][..2], [Cell::Int(3), Cell::Int(50)]);
        assert_eq!(tables["jointAngle"].rows[0][2..], [Cell::Float(10.0), Cell::Float(20.0), Cell::Float(30.0)]);
    }

    #[test]
    fn test_flatten_checks_segment_count() {
        let xml = RECORDING
            .replace(r#"index="""#, r#"index="0""#)
            .replace(r#"segmentCount="2""#, r#"segmentCount="3""#);
        let recording = Mvnx::parse_str(&xml, None).unwrap();

        match recording.flatten(&["position"]).unwrap_err() {
            MvnxError::SegmentCountMismatch { declared, actual } => {
                assert_eq!(declared, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_available_channels() {
        let channels = fixed_recording().available_channels().unwrap();
        assert_eq!(channels, vec![Channel::Position, Channel::JointAngle, Channel::Ms]);
    }

    #[test]
    fn test_unsupported_field_checked_first() {
        // The broken config frames are never reached.
        let recording = Mvnx::parse_str(RECORDING, None).unwrap();
        assert!(matches!(
            recording.flatten(&["sensorOrientation"]),
            Err(MvnxError::UnsupportedField(_))
        ));
    }

    #[test]
    fn test_export_to_buffer() {
        let recording = fixed_recording().with_config(ExtractConfig {
            pretty_export: false,
            ..ExtractConfig::default()
        });
        let mut buffer = Vec::new();
        recording.export_to(&mut buffer, "unit test").unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.starts_with("<?xml"));
        assert!(output.contains("exportComment=\"Exported from mvnx on "));
        assert!(output.contains("unit test\""));

        let reparsed = Mvnx::parse_str(&output, None).unwrap();
        assert_eq!(reparsed.extract_segments().unwrap(), vec!["Pelvis", "Head"]);
    }
}
