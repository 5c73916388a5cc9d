//! Column plans for flattening
//!
//! A plan fixes, once per request, which channels are flattened, how wide each
//! frame's vector must be and what the columns are called. Frames are then
//! processed without any further lookups.

use std::fmt;
use std::str::FromStr;

use crate::error::{MvnxError, Result};

/// Labels of the four foot contact flags, in the order MVN writes them.
pub const FOOT_CONTACT_LABELS: [&str; 4] = [
    "left_heel_on_ground",
    "left_toe_on_ground",
    "right_heel_on_ground",
    "right_toe_on_ground",
];

const QUATERNION_DIMS: [&str; 4] = ["q0", "q1", "q2", "q3"];
const AXIS_DIMS: [&str; 3] = ["x", "y", "z"];
const COM_COLUMNS: [&str; 3] = ["com_x", "com_y", "com_z"];

/// A channel that can be flattened into a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    Orientation,
    Position,
    Velocity,
    Acceleration,
    AngularVelocity,
    AngularAcceleration,
    FootContacts,
    JointAngle,
    CenterOfMass,
    Ms,
}

impl Channel {
    /// Every channel, in the order tables are listed.
    pub const ALL: [Channel; 10] = [
        Channel::Orientation,
        Channel::Position,
        Channel::Velocity,
        Channel::Acceleration,
        Channel::AngularVelocity,
        Channel::AngularAcceleration,
        Channel::FootContacts,
        Channel::JointAngle,
        Channel::CenterOfMass,
        Channel::Ms,
    ];

    /// The frame field name, which is also the table name.
    pub fn field_name(self) -> &'static str {
        match self {
            Channel::Orientation => "orientation",
            Channel::Position => "position",
            Channel::Velocity => "velocity",
            Channel::Acceleration => "acceleration",
            Channel::AngularVelocity => "angularVelocity",
            Channel::AngularAcceleration => "angularAcceleration",
            Channel::FootContacts => "footContacts",
            Channel::JointAngle => "jointAngle",
            Channel::CenterOfMass => "centerOfMass",
            Channel::Ms => "ms",
        }
    }

    pub fn layout(self) -> Layout {
        match self {
            Channel::Orientation => Layout::PerSegment(&QUATERNION_DIMS),
            Channel::Position
            | Channel::Velocity
            | Channel::Acceleration
            | Channel::AngularVelocity
            | Channel::AngularAcceleration => Layout::PerSegment(&AXIS_DIMS),
            // Joint angles are Euler angles, one x/y/z triple per joint.
            Channel::JointAngle => Layout::PerJoint(&AXIS_DIMS),
            Channel::FootContacts => Layout::Flags(&FOOT_CONTACT_LABELS),
            Channel::CenterOfMass => Layout::Fixed(&COM_COLUMNS),
            Channel::Ms => Layout::Timestamp,
        }
    }

    /// Parse every requested name before any work starts.
    ///
    /// # Errors
    ///
    /// Returns [`MvnxError::UnsupportedField`] for the first name outside the vocabulary.
    pub fn parse_all<S: AsRef<str>>(names: &[S]) -> Result<Vec<Channel>> {
        let mut channels = Vec::with_capacity(names.len());
        for name in names {
            let channel: Channel = name.as_ref().parse()?;
            if !channels.contains(&channel) {
                channels.push(channel);
            }
        }
        Ok(channels)
    }
}

impl FromStr for Channel {
    type Err = MvnxError;

    fn from_str(s: &str) -> Result<Self> {
        Channel::ALL
            .iter()
            .copied()
            .find(|c| c.field_name() == s)
            .ok_or_else(|| MvnxError::UnsupportedField(s.to_string()))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// How a channel's per-frame value maps onto columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// One group of dimension columns per segment.
    PerSegment(&'static [&'static str]),
    /// One group of dimension columns per joint.
    PerJoint(&'static [&'static str]),
    /// Fixed columns of numeric values.
    Fixed(&'static [&'static str]),
    /// Fixed columns of on/off flags parsed from raw text.
    Flags(&'static [&'static str]),
    /// No value columns beyond `frame_idx` and `ms`.
    Timestamp,
}

/// Pre-computed columns for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelPlan {
    pub channel: Channel,
    pub header: Vec<String>,
    /// Number of values each frame must supply.
    pub width: usize,
}

impl ChannelPlan {
    fn new(channel: Channel, segments: &[String], joints: &[String]) -> Self {
        let mut header = vec!["frame_idx".to_string(), "ms".to_string()];
        match channel.layout() {
            Layout::PerSegment(dims) => header.extend(entity_columns(segments, dims)),
            Layout::PerJoint(dims) => header.extend(entity_columns(joints, dims)),
            Layout::Fixed(columns) | Layout::Flags(columns) => {
                header.extend(columns.iter().map(|c| c.to_string()))
            }
            Layout::Timestamp => {}
        }
        let width = header.len() - 2;
        ChannelPlan {
            channel,
            header,
            width,
        }
    }
}

fn entity_columns<'a>(
    entities: &'a [String],
    dims: &'a [&'static str],
) -> impl Iterator<Item = String> + 'a {
    entities
        .iter()
        .flat_map(move |entity| dims.iter().map(move |dim| format!("{}_{}", entity, dim)))
}

/// Plans for every requested channel against one skeleton layout.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenPlan {
    pub channels: Vec<ChannelPlan>,
}

impl FlattenPlan {
    /// Build a plan for already-parsed channels.
    pub fn new(channels: &[Channel], segments: &[String], joints: &[String]) -> Self {
        FlattenPlan {
            channels: channels
                .iter()
                .map(|&c| ChannelPlan::new(c, segments, joints))
                .collect(),
        }
    }

    /// Build a plan from field names, rejecting unsupported ones up front.
    pub fn from_names<S: AsRef<str>>(
        names: &[S],
        segments: &[String],
        joints: &[String],
    ) -> Result<Self> {
        let channels = Channel::parse_all(names)?;
        Ok(Self::new(&channels, segments, joints))
    }

    pub fn get(&self, channel: Channel) -> Option<&ChannelPlan> {
        self.channels.iter().find(|p| p.channel == channel)
    }
}
