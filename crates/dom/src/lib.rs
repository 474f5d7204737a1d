//! Live document model.
//!
//! This crate plays the role of the host page: an arena of nodes that can be
//! mutated, plus the per-node live state (scroll, layout, form controls,
//! media, stylesheets, nested frames) that a recorder reads but that never
//! shows up in the tree itself.
//!
//! Every tree mutation on a connected node is queued as a [`MutationRecord`];
//! [`Dom::take_records`] drains them in delivery order.

mod document;
mod error;
mod live;
mod mutation;
mod node;

pub use crate::document::Dom;
pub use crate::error::DomError;
pub use crate::mutation::MutationRecord;
pub use crate::node::{NodeKind, NodeRef, ReadyState};

#[cfg(test)]
mod tests;
