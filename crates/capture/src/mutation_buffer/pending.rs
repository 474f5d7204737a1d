use dom::{Dom, NodeRef};
use std::collections::HashMap;

pub(crate) type Slot = usize;

#[derive(Debug)]
struct Entry {
    node: NodeRef,
    prev: Option<Slot>,
    next: Option<Slot>,
    live: bool,
}

/// Added nodes whose position could not be expressed with known ids yet.
///
/// A doubly-linked list over an append-only arena: removal from any position
/// is O(1) and slots stay valid for the lifetime of the list. Entries are kept
/// roughly in sibling order: a node goes right after its previous sibling if
/// that one is listed, else right before its next sibling, else to the front.
#[derive(Debug, Default)]
pub(crate) struct PendingAdds {
    entries: Vec<Entry>,
    index: HashMap<NodeRef, Slot>,
    head: Option<Slot>,
    tail: Option<Slot>,
    len: usize,
}

impl PendingAdds {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn contains(&self, node: NodeRef) -> bool {
        self.index.contains_key(&node)
    }

    pub(crate) fn insert(&mut self, dom: &Dom, node: NodeRef) {
        if self.contains(node) {
            return;
        }
        let slot = self.entries.len();
        let after = dom
            .previous_sibling(node)
            .and_then(|sibling| self.index.get(&sibling).copied());
        let before = dom
            .next_sibling(node)
            .and_then(|sibling| self.index.get(&sibling).copied());

        let (prev, next) = match (after, before) {
            (Some(prev), _) => (Some(prev), self.entries[prev].next),
            (None, Some(next)) => (self.entries[next].prev, Some(next)),
            (None, None) => (None, self.head),
        };
        self.entries.push(Entry {
            node,
            prev,
            next,
            live: true,
        });
        match prev {
            Some(prev) => self.entries[prev].next = Some(slot),
            None => self.head = Some(slot),
        }
        match next {
            Some(next) => self.entries[next].prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.index.insert(node, slot);
        self.len += 1;
    }

    /// Unlink the entry at `slot`, returning its node if it was still listed.
    pub(crate) fn remove(&mut self, slot: Slot) -> Option<NodeRef> {
        let entry = self.entries.get_mut(slot).filter(|e| e.live)?;
        entry.live = false;
        let (node, prev, next) = (entry.node, entry.prev, entry.next);
        match prev {
            Some(prev) => self.entries[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.entries[next].prev = prev,
            None => self.tail = prev,
        }
        self.index.remove(&node);
        self.len -= 1;
        Some(node)
    }

    pub(crate) fn node(&self, slot: Slot) -> Option<NodeRef> {
        self.entries
            .get(slot)
            .filter(|e| e.live)
            .map(|e| e.node)
    }

    /// List predecessor of the entry at `slot`.
    pub(crate) fn prev(&self, slot: Slot) -> Option<Slot> {
        self.entries.get(slot).filter(|e| e.live).and_then(|e| e.prev)
    }

    /// Entries from tail to head.
    pub(crate) fn iter_back(&self) -> impl Iterator<Item = (Slot, NodeRef)> + '_ {
        std::iter::successors(self.tail, |slot| self.entries[*slot].prev)
            .map(|slot| (slot, self.entries[slot].node))
    }

    #[cfg(test)]
    pub(crate) fn nodes(&self) -> Vec<NodeRef> {
        std::iter::successors(self.head, |slot| self.entries[*slot].next)
            .map(|slot| self.entries[slot].node)
            .collect()
    }
}
