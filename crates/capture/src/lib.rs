//! Recording core: stable node identities, tree serialization and mutation
//! buffering.
//!
//! A [`CaptureSession`] owns everything scoped to one recording: the
//! [`Mirror`] id space, pending frame waits and the [`MutationBuffer`]. Full
//! captures go through the [`Serializer`]; observed mutation batches go
//! through the buffer, which emits one [`IncrementalRecord`] per non-empty
//! flush.

mod block;
mod config;
mod counters;
mod frames;
mod mirror;
mod mutation_buffer;
mod record;
mod serializer;
mod session;
mod sink;
mod url_rewrite;

pub use crate::block::is_blocked;
pub use crate::config::CaptureConfig;
pub use crate::counters::Counters;
pub use crate::frames::{FrameWaiter, frame_ready};
pub use crate::mirror::Mirror;
pub use crate::mutation_buffer::MutationBuffer;
pub use crate::record::{
    AddedNode, AttributeUpdate, AttributeValue, Attributes, CapturedNode, FullSnapshot,
    IncrementalRecord, NodeData, NodeId, Record, RemovedNode, TextUpdate,
};
pub use crate::serializer::{CaptureContext, Serializer};
pub use crate::session::CaptureSession;
pub use crate::sink::{RecordSink, VecRecordSink};
pub use crate::url_rewrite::{absolute_url, absolute_srcset, transform_attribute};
