//! # mvnx - Motion Capture Extraction Toolkit
//!
//! Turns Xsens MVNX recordings (XML) into typed records and flat tables.
//!
//! ## Modules
//!
//! - **registry**: Classify field names and project raw fields into typed values
//! - **document**: Parse, validate and re-serialize the element tree
//! - **extract**: Frames (configuration and motion), segments, joints and the skeleton
//! - **flatten**: Expand per-frame vectors into named columns, write CSV
//! - **schema**: Structural schemas, validation and inference from samples
//! - **logging**: Subscriber setup shared by the command-line tools
//!
//! ## Quick Start
//!
//! ```rust
//! use mvnx::{Cell, Mvnx};
//!
//! # fn main() -> mvnx::Result<()> {
//! let xml = r#"<mvnx><subject>
//!   <segments><segment label="Pelvis" id="1"/></segments>
//!   <joints/>
//!   <frames segmentCount="1" sensorCount="0" jointCount="0">
//!     <frame index="0" ms="0" type="identity"/>
//!     <frame index="0" ms="0" type="tpose"/>
//!     <frame index="0" ms="0" type="tpose-isb"/>
//!     <frame index="3" ms="50" type="normal"><position>1 2 3</position></frame>
//!   </frames>
//! </subject></mvnx>"#;
//!
//! let recording = Mvnx::parse_str(xml, None)?;
//! let tables = recording.flatten(&["position"])?;
//!
//! // frame_idx, ms, Pelvis_x, Pelvis_y, Pelvis_z
//! assert_eq!(tables["position"].rows[0][2], Cell::Float(1.0));
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod error;
pub mod extract;
pub mod flatten;
pub mod logging;
pub mod mvnx;
pub mod registry;
pub mod schema;
pub mod types;

// Re-export commonly used types for convenience
pub use document::{Document, Element};
pub use error::{MvnxError, Result};
pub use extract::{extract_frames, extract_joints, extract_segments, extract_skeleton, Skeleton};
pub use flatten::{flatten, Channel, FlattenPlan, Flattener, TableWriter};
pub use mvnx::{ExtractConfig, Mvnx};
pub use registry::{FieldCategory, FieldRegistry};
pub use schema::{Schema, SchemaBuilder};
pub use types::{
    Cell, Connector, FieldValue, FlattenedTable, FrameInfo, Joint, Keypoint, RawRecord,
    RawValue, Segment, TypedRecord, CONFIG_FRAME_COUNT,
};
