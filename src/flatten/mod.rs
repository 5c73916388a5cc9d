//! Flattening motion frames into tables
//!
//! Each requested channel becomes one table with a `frame_idx`, `ms` prefix and one
//! column per segment (or joint) and dimension, in skeleton order.
//!
//! ## Planned flattening
//!
//! Columns and expected vector widths are fixed by a [`FlattenPlan`] before any frame
//! is read, so an unsupported request fails before work starts and every frame is
//! checked against the same layout.

pub mod flattener;
pub mod plan;
pub mod writer;

pub use flattener::{flatten, Flattener};
pub use plan::{Channel, ChannelPlan, FlattenPlan, Layout, FOOT_CONTACT_LABELS};
pub use writer::{write_table, TableWriter};
