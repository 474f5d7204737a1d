use crate::record::NodeId;
use dom::{Dom, NodeRef};
use std::collections::HashMap;

/// Session-scoped side table between live nodes and their ids.
///
/// Ids are assigned once per node and never reassigned. Whether a node is
/// currently *tracked* is separate: eviction untracks a node (and its
/// descendants) but keeps its assignment, so a node that comes back later is
/// re-registered under the id it had before.
#[derive(Debug)]
pub struct Mirror {
    next_id: u32,
    assigned: HashMap<NodeRef, NodeId>,
    tracked: HashMap<NodeId, NodeRef>,
}

impl Default for Mirror {
    fn default() -> Self {
        Self::new()
    }
}

impl Mirror {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            assigned: HashMap::new(),
            tracked: HashMap::new(),
        }
    }

    /// Id of a tracked node; `None` for unknown or evicted nodes.
    pub fn id_of(&self, node: NodeRef) -> Option<NodeId> {
        let id = *self.assigned.get(&node)?;
        self.tracked.contains_key(&id).then_some(id)
    }

    /// Id ever handed to `node` in this session, tracked or not.
    pub fn assigned_id(&self, node: NodeRef) -> Option<NodeId> {
        self.assigned.get(&node).copied()
    }

    pub fn node_of(&self, id: NodeId) -> Option<NodeRef> {
        self.tracked.get(&id).copied()
    }

    pub fn exists(&self, id: NodeId) -> bool {
        self.tracked.contains_key(&id)
    }

    /// Track `node`, reusing its previous id if it ever had one.
    pub fn register(&mut self, node: NodeRef) -> NodeId {
        let id = match self.assigned.get(&node) {
            Some(id) => *id,
            None => {
                let id = NodeId(self.next_id);
                self.next_id += 1;
                self.assigned.insert(node, id);
                id
            }
        };
        self.tracked.insert(id, node);
        id
    }

    /// Untrack `node` and every tracked node below it, including the content
    /// of a hosted frame document.
    pub fn evict(&mut self, dom: &Dom, node: NodeRef) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if let Some(id) = self.assigned.get(&current) {
                self.tracked.remove(id);
            }
            stack.extend_from_slice(dom.children(current));
            if let Some(doc) = dom.frame_document(current) {
                stack.push(doc);
            }
        }
    }

    /// Number of tracked nodes.
    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }
}
