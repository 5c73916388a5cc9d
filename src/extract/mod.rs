//! Extraction of typed data from a parsed recording
//!
//! Extractors never modify the document: each call walks the tree and returns a
//! fresh projection of the part it covers.

pub mod frames;
pub mod skeleton;

pub use frames::{check_segment_count, extract_frames};
pub use skeleton::{
    extract_joints, extract_segments, extract_skeleton, ResolvedJoint, Skeleton,
};
