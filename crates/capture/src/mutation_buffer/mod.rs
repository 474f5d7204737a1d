//! Consolidation of raw mutation batches into incremental records.
//!
//! Notifications are classified as they arrive; ids are only resolved at
//! flush time, after the nodes removed during the cycle have been evicted
//! from the mirror. Added nodes whose parent or next sibling has no id yet
//! wait in a [`PendingAdds`] list until a neighbour gets serialized.

mod pending;

use crate::block::is_blocked;
use crate::counters::Counters;
use crate::record::{AddedNode, AttributeUpdate, IncrementalRecord, NodeId, RemovedNode, TextUpdate};
use crate::serializer::{CaptureContext, Serializer, base_url};
use crate::url_rewrite::transform_attribute;
use dom::{Dom, MutationRecord, NodeKind, NodeRef};
use pending::PendingAdds;
use std::collections::{BTreeMap, HashSet};

/// Insertion-ordered set of nodes.
#[derive(Debug, Default)]
struct NodeSet {
    order: Vec<NodeRef>,
    members: HashSet<NodeRef>,
}

impl NodeSet {
    /// Returns whether `node` was newly inserted.
    fn insert(&mut self, node: NodeRef) -> bool {
        let fresh = self.members.insert(node);
        if fresh {
            self.order.push(node);
        }
        fresh
    }

    fn remove(&mut self, node: NodeRef) {
        if self.members.remove(&node) {
            self.order.retain(|n| *n != node);
        }
    }

    fn contains(&self, node: NodeRef) -> bool {
        self.members.contains(&node)
    }

    fn to_vec(&self) -> Vec<NodeRef> {
        self.order.clone()
    }

    fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }

    /// Remove `node` and its current descendants.
    fn deep_remove(&mut self, dom: &Dom, node: NodeRef) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            self.remove(current);
            stack.extend_from_slice(dom.children(current));
        }
    }

    /// Whether a strict ancestor of `node` is a member.
    fn has_ancestor_of(&self, dom: &Dom, node: NodeRef) -> bool {
        let mut current = dom.parent(node);
        while let Some(parent) = current {
            if self.contains(parent) {
                return true;
            }
            current = dom.parent(parent);
        }
        false
    }
}

#[derive(Clone, Copy, Debug)]
struct PendingRemove {
    parent_id: NodeId,
    id: NodeId,
    node: NodeRef,
}

#[derive(Debug)]
struct AttributeBaseline {
    node: NodeRef,
    /// Attribute name and its value before the first change of the cycle.
    names: Vec<(String, Option<String>)>,
}

#[derive(Debug, Default)]
pub struct MutationBuffer {
    frozen: bool,
    /// Text nodes with their data before the first change of the cycle.
    texts: Vec<(NodeRef, Option<String>)>,
    attributes: Vec<AttributeBaseline>,
    removes: Vec<PendingRemove>,
    added: NodeSet,
    moved: NodeSet,
    dropped: NodeSet,
    /// (node, new parent) pairs of moves seen this cycle, by assigned id.
    move_keys: HashSet<(NodeId, NodeId)>,
    evictions: Vec<NodeRef>,
}

impl MutationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Resume flushing. Nothing is flushed until the next batch or an
    /// explicit [`MutationBuffer::flush`].
    pub fn unfreeze(&mut self) {
        self.frozen = false;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Classify a notification batch, then flush unless frozen.
    pub fn process_mutations(
        &mut self,
        dom: &Dom,
        ctx: &mut CaptureContext,
        records: &[MutationRecord],
    ) -> Option<IncrementalRecord> {
        for record in records {
            self.process_mutation(dom, ctx, record);
        }
        if self.frozen {
            log::trace!(target: "capture.mutation", "frozen, buffering {} records", records.len());
            return None;
        }
        self.flush(dom, ctx)
    }

    fn process_mutation(&mut self, dom: &Dom, ctx: &CaptureContext, record: &MutationRecord) {
        let block_class = ctx.config.block_class.as_str();
        match record {
            MutationRecord::CharacterData { target, old_value } => {
                if is_blocked(dom, *target, block_class) {
                    return;
                }
                // the first old value of the cycle is the baseline
                if !self.texts.iter().any(|(node, _)| node == target) {
                    self.texts.push((*target, old_value.clone()));
                }
            }
            MutationRecord::Attributes {
                target,
                name,
                old_value,
            } => {
                if is_blocked(dom, *target, block_class) {
                    return;
                }
                let pos = self.attributes.iter().position(|a| a.node == *target);
                if pos.is_some_and(|pos| self.attributes[pos].names.iter().any(|(n, _)| n == name)) {
                    return;
                }
                let baseline = (name.clone(), old_value.clone());
                match pos {
                    Some(pos) => self.attributes[pos].names.push(baseline),
                    None => self.attributes.push(AttributeBaseline {
                        node: *target,
                        names: vec![baseline],
                    }),
                }
            }
            MutationRecord::ChildList {
                target,
                added,
                removed,
            } => {
                for node in added {
                    self.handle_added(dom, ctx, *node, *target);
                }
                for node in removed {
                    self.handle_removed(dom, ctx, *target, *node);
                }
            }
        }
    }

    fn handle_added(&mut self, dom: &Dom, ctx: &CaptureContext, node: NodeRef, target: NodeRef) {
        let block_class = ctx.config.block_class.as_str();
        if is_blocked(dom, node, block_class) {
            return;
        }
        let mirror = &ctx.mirror;
        if let (Some(id), Some(target_id)) = (mirror.assigned_id(node), mirror.assigned_id(target)) {
            self.move_keys.insert((id, target_id));
        }
        // below a node that is not blocked only the class itself can block;
        // a subtree already classified this cycle was walked in its final state
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let fresh = match mirror.assigned_id(current) {
                Some(_) => self.moved.insert(current),
                None => {
                    self.dropped.remove(current);
                    self.added.insert(current)
                }
            };
            if !fresh {
                continue;
            }
            stack.extend(
                dom.children(current)
                    .iter()
                    .rev()
                    .filter(|child| !dom.has_class(**child, block_class)),
            );
        }
    }

    fn handle_removed(&mut self, dom: &Dom, ctx: &CaptureContext, target: NodeRef, node: NodeRef) {
        // the node may have moved into an excluded area since; only where it
        // was removed from decides
        if is_blocked(dom, target, &ctx.config.block_class) {
            return;
        }
        let mirror = &ctx.mirror;
        let node_id = mirror.id_of(node);
        let parent_id = mirror.id_of(target);

        if self.added.contains(node) {
            // added and removed within the cycle: never existed for the replay
            self.added.deep_remove(dom, node);
            self.dropped.insert(node);
        } else if self.added.contains(target) && node_id.is_none() {
            // removed from a fresh parent before it was ever serialized
        } else if ancestor_removed(dom, ctx, target) {
            log::trace!(target: "capture.mutation", "{node:?} removed under a removed ancestor");
        } else if self.moved.contains(node) && self.is_move(ctx, node, target) {
            self.moved.deep_remove(dom, node);
        } else if let (Some(parent_id), Some(id)) = (parent_id, node_id) {
            self.removes.push(PendingRemove {
                parent_id,
                id,
                node,
            });
        } else {
            log::trace!(target: "capture.mutation", "untracked removal of {node:?}");
        }
        self.evictions.push(node);
    }

    fn is_move(&self, ctx: &CaptureContext, node: NodeRef, target: NodeRef) -> bool {
        match (ctx.mirror.assigned_id(node), ctx.mirror.assigned_id(target)) {
            (Some(id), Some(target_id)) => self.move_keys.contains(&(id, target_id)),
            _ => false,
        }
    }

    /// Consolidate everything buffered since the last flush.
    ///
    /// Returns `None` when nothing observable changed; the buffer is reset
    /// either way.
    pub fn flush(&mut self, dom: &Dom, ctx: &mut CaptureContext) -> Option<IncrementalRecord> {
        let CaptureContext {
            config,
            mirror,
            frames,
            counters,
        } = ctx;
        counters.flushes += 1;
        for node in self.evictions.drain(..) {
            mirror.evict(dom, node);
        }

        let removed_ids: HashSet<NodeId> = self.removes.iter().map(|r| r.id).collect();
        let mut serializer = Serializer::new(dom, config, mirror, frames);
        let mut adds = Vec::new();
        let mut pending = PendingAdds::new();

        for node in self.moved.to_vec() {
            if serializer.was_serialized(node) {
                continue;
            }
            let parent_moved = dom.parent(node).is_some_and(|p| self.moved.contains(p));
            if parent_removed(&serializer, &removed_ids, node) && !parent_moved {
                continue;
            }
            push_add(&mut serializer, &mut pending, &mut adds, node);
        }

        for node in self.added.to_vec() {
            // already emitted inside an earlier subtree
            if serializer.was_serialized(node) {
                continue;
            }
            if !self.dropped.has_ancestor_of(dom, node)
                && !parent_removed(&serializer, &removed_ids, node)
            {
                push_add(&mut serializer, &mut pending, &mut adds, node);
            } else if self.moved.has_ancestor_of(dom, node) {
                push_add(&mut serializer, &mut pending, &mut adds, node);
            } else {
                self.dropped.insert(node);
            }
        }

        drain_pending(&mut serializer, &mut pending, &mut adds, counters);

        let removes = self
            .removes
            .drain(..)
            .filter(|r| !serializer.was_serialized(r.node))
            .map(|r| RemovedNode {
                parent_id: r.parent_id,
                id: r.id,
            })
            .collect();

        let mut texts = Vec::new();
        for (node, baseline) in self.texts.drain(..) {
            if !serializer.is_serializable(node) {
                continue;
            }
            let Some(id) = serializer.mirror().id_of(node) else {
                log::trace!(target: "capture.mutation", "dropping text update for untracked {node:?}");
                counters.stale_updates += 1;
                continue;
            };
            if serializer.was_serialized(node) {
                continue;
            }
            let Some(value) = dom.text(node) else {
                continue;
            };
            if baseline.as_deref() != Some(value) {
                texts.push(TextUpdate {
                    id,
                    value: value.to_string(),
                });
            }
        }

        let mut attributes = Vec::new();
        for entry in self.attributes.drain(..) {
            let Some(id) = serializer.mirror().id_of(entry.node) else {
                log::trace!(target: "capture.mutation", "dropping attribute update for untracked {:?}", entry.node);
                counters.stale_updates += 1;
                continue;
            };
            if serializer.was_serialized(entry.node) {
                continue;
            }
            let base = base_url(dom, entry.node);
            let changed: BTreeMap<String, Option<String>> = entry
                .names
                .into_iter()
                .filter_map(|(name, baseline)| {
                    let current = dom.attribute(entry.node, &name);
                    (current != baseline.as_deref()).then(|| {
                        let value = current.map(|v| transform_attribute(base, &name, v));
                        (name, value)
                    })
                })
                .collect();
            if !changed.is_empty() {
                attributes.push(AttributeUpdate {
                    id,
                    attributes: changed,
                });
            }
        }

        self.added.clear();
        self.moved.clear();
        self.dropped.clear();
        self.move_keys.clear();

        let record = IncrementalRecord {
            texts,
            attributes,
            removes,
            adds,
        };
        if record.is_empty() {
            counters.suppressed_flushes += 1;
            log::trace!(target: "capture.mutation", "flush produced nothing");
            return None;
        }
        log::debug!(
            target: "capture.mutation",
            "flush: {} texts, {} attributes, {} removes, {} adds",
            record.texts.len(),
            record.attributes.len(),
            record.removes.len(),
            record.adds.len()
        );
        Some(record)
    }
}

/// Whether an ancestor of `node` was explicitly removed this cycle.
fn parent_removed(serializer: &Serializer<'_>, removed: &HashSet<NodeId>, node: NodeRef) -> bool {
    let dom = serializer.dom();
    let mut current = dom.parent(node);
    while let Some(parent) = current {
        if serializer
            .mirror()
            .assigned_id(parent)
            .is_some_and(|id| removed.contains(&id))
        {
            return true;
        }
        current = dom.parent(parent);
    }
    false
}

/// Whether a removal under `target` is already implied by the removal of one
/// of its ancestors: the chain up from `target` leaves the tracked set before
/// reaching a document. A document target never counts as removed.
fn ancestor_removed(dom: &Dom, ctx: &CaptureContext, target: NodeRef) -> bool {
    let mut current = target;
    loop {
        if matches!(dom.kind(current), Some(NodeKind::Document { .. })) {
            return false;
        }
        if ctx.mirror.id_of(current).is_none() {
            return true;
        }
        match dom.parent(current) {
            Some(parent) => current = parent,
            None => return true,
        }
    }
}

/// Parent id and next-sibling id of `node`, if both are known. A next
/// sibling that will never be serialized counts as no sibling.
fn resolve_position(serializer: &Serializer<'_>, node: NodeRef) -> Option<(NodeId, Option<NodeId>)> {
    let dom = serializer.dom();
    let parent_id = serializer.mirror().id_of(dom.parent(node)?)?;
    let next_id = match dom.next_sibling(node) {
        None => None,
        Some(next) => match serializer.mirror().id_of(next) {
            Some(id) => Some(id),
            None if !serializer.is_serializable(next) => None,
            None => return None,
        },
    };
    Some((parent_id, next_id))
}

fn push_add(
    serializer: &mut Serializer<'_>,
    pending: &mut PendingAdds,
    adds: &mut Vec<AddedNode>,
    node: NodeRef,
) {
    let dom = serializer.dom();
    if serializer.was_serialized(node) || !serializer.is_serializable(node) {
        return;
    }
    if dom.parent(node).is_none() || !dom.is_connected(node) {
        log::trace!(target: "capture.mutation", "skipping detached add {node:?}");
        return;
    }
    let Some((parent_id, next_id)) = resolve_position(serializer, node) else {
        pending.insert(dom, node);
        return;
    };
    if let Some(captured) = serializer.capture_tree(node) {
        adds.push(AddedNode {
            parent_id,
            next_id,
            node: captured,
        });
    }
}

/// Already emitted as part of another subtree, or placeable now.
fn is_ready(serializer: &Serializer<'_>, node: NodeRef) -> bool {
    serializer.was_serialized(node) || resolve_position(serializer, node).is_some()
}

/// Retry pending adds until none is left or a whole pass makes no progress.
fn drain_pending(
    serializer: &mut Serializer<'_>,
    pending: &mut PendingAdds,
    adds: &mut Vec<AddedNode>,
    counters: &mut Counters,
) {
    let mut candidate = None;
    while !pending.is_empty() {
        let mut found = candidate.filter(|slot| {
            pending
                .node(*slot)
                .is_some_and(|node| is_ready(serializer, node))
        });
        if found.is_none() {
            found = pending
                .iter_back()
                .find(|(_, node)| is_ready(serializer, *node))
                .map(|(slot, _)| slot);
        }
        let Some(slot) = found else {
            log::warn!(
                target: "capture.mutation",
                "abandoning {} pending adds with unresolved positions",
                pending.len()
            );
            counters.abandoned_adds += pending.len() as u64;
            break;
        };
        candidate = pending.prev(slot);
        if let Some(node) = pending.remove(slot) {
            push_add(serializer, pending, adds, node);
        }
    }
}
