//! Tree serialization into portable [`CapturedNode`]s.
//!
//! A [`Serializer`] borrows the session's mirror for the duration of one
//! capture (a full snapshot, one flush, or one late frame attach) and
//! remembers which live nodes it has emitted so callers can avoid emitting a
//! node twice.

mod attributes;

pub(crate) use attributes::base_url;

use crate::block::is_blocked;
use crate::config::CaptureConfig;
use crate::counters::Counters;
use crate::frames::{FrameWaiter, frame_ready};
use crate::mirror::Mirror;
use crate::record::{Attributes, CapturedNode, FullSnapshot, NodeData, NodeId};
use dom::{Dom, NodeKind, NodeRef};
use std::collections::HashSet;
use std::time::Instant;

/// Everything scoped to one capture session except the mutation buffer.
#[derive(Debug, Default)]
pub struct CaptureContext {
    pub config: CaptureConfig,
    pub mirror: Mirror,
    pub frames: FrameWaiter,
    pub counters: Counters,
}

impl CaptureContext {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            mirror: Mirror::new(),
            frames: FrameWaiter::new(),
            counters: Counters::default(),
        }
    }

    pub fn serializer<'a>(&'a mut self, dom: &'a Dom) -> Serializer<'a> {
        Serializer::new(dom, &self.config, &mut self.mirror, &mut self.frames)
    }
}

pub struct Serializer<'a> {
    dom: &'a Dom,
    config: &'a CaptureConfig,
    mirror: &'a mut Mirror,
    frames: &'a mut FrameWaiter,
    serialized: HashSet<NodeRef>,
}

impl<'a> Serializer<'a> {
    pub fn new(
        dom: &'a Dom,
        config: &'a CaptureConfig,
        mirror: &'a mut Mirror,
        frames: &'a mut FrameWaiter,
    ) -> Self {
        Self {
            dom,
            config,
            mirror,
            frames,
            serialized: HashSet::new(),
        }
    }

    pub fn dom(&self) -> &'a Dom {
        self.dom
    }

    pub fn mirror(&self) -> &Mirror {
        &*self.mirror
    }

    /// Whether `node` was emitted by this serializer.
    pub fn was_serialized(&self, node: NodeRef) -> bool {
        self.serialized.contains(&node)
    }

    /// Whether `node` itself would produce a captured node, ignoring its
    /// ancestors. Comments, script text and marked elements never do.
    pub fn is_serializable(&self, node: NodeRef) -> bool {
        match self.dom.kind(node) {
            Some(NodeKind::Element { .. }) => !self.dom.has_class(node, &self.config.block_class),
            Some(NodeKind::Text { .. }) => !self
                .dom
                .parent(node)
                .is_some_and(|parent| self.dom.is_element_named(parent, "script")),
            Some(NodeKind::Document { .. } | NodeKind::Doctype { .. }) => true,
            Some(NodeKind::Comment { .. }) | None => false,
        }
    }

    /// Attribute record of an element; `None` for non-elements and for
    /// excluded elements.
    pub fn capture_attributes(&self, node: NodeRef) -> Option<Attributes> {
        self.dom.tag_name(node)?;
        if is_blocked(self.dom, node, &self.config.block_class) {
            return None;
        }
        Some(attributes::element_attributes(self.dom, self.config, node))
    }

    /// Serialize `node` and its subtree, assigning ids to first-seen nodes and
    /// reusing the ids of known ones.
    pub fn capture_tree(&mut self, node: NodeRef) -> Option<CapturedNode> {
        if is_blocked(self.dom, node, &self.config.block_class) {
            log::trace!(target: "capture.serializer", "skipping excluded {node:?}");
            return None;
        }
        self.walk(node)
    }

    /// Serialize the top-level document together with its scroll position.
    pub fn capture_full(&mut self) -> Option<FullSnapshot> {
        let root = self.dom.document();
        let node = self.capture_tree(root)?;
        Some(FullSnapshot {
            node,
            initial_offset: self.dom.scroll(root),
        })
    }

    /// Pre-order walk with an explicit stack of open nodes; ids are assigned
    /// before children, and a frame's nested document after its children.
    fn walk(&mut self, root: NodeRef) -> Option<CapturedNode> {
        let dom = self.dom;
        let mut stack = vec![self.open(root, false)?];
        while let Some(top) = stack.last_mut() {
            if let Some(child) = dom.children(top.node).get(top.next_child).copied() {
                top.next_child += 1;
                if let Some(open) = self.open(child, false) {
                    stack.push(open);
                }
                continue;
            }
            if top.frame_pending {
                top.frame_pending = false;
                let iframe = top.node;
                if let Some(open) = self.frame_content(iframe).and_then(|doc| self.open(doc, true)) {
                    stack.push(open);
                }
                continue;
            }
            let done = stack.pop()?;
            let Some(parent) = stack.last_mut() else {
                return Some(done.captured);
            };
            match &mut parent.captured.data {
                NodeData::Element {
                    content_document, ..
                } if done.is_content => *content_document = Some(Box::new(done.captured)),
                NodeData::Document { child_nodes } | NodeData::Element { child_nodes, .. } => {
                    child_nodes.push(done.captured)
                }
                NodeData::DocumentType { .. } | NodeData::Text { .. } => {}
            }
        }
        None
    }

    /// Register `node` and build its captured form without children.
    fn open(&mut self, node: NodeRef, is_content: bool) -> Option<OpenNode> {
        if !self.is_serializable(node) {
            return None;
        }
        let dom = self.dom;
        let data = match dom.kind(node)? {
            NodeKind::Document { .. } => NodeData::Document {
                child_nodes: Vec::new(),
            },
            NodeKind::Doctype {
                name,
                public_id,
                system_id,
            } => NodeData::DocumentType {
                name: name.clone(),
                public_id: public_id.clone(),
                system_id: system_id.clone(),
            },
            NodeKind::Element { name, .. } => NodeData::Element {
                tag_name: name.clone(),
                attributes: attributes::element_attributes(dom, self.config, node),
                child_nodes: Vec::new(),
                content_document: None,
            },
            NodeKind::Text { text } => NodeData::Text {
                text_content: text.clone(),
                is_css_rules: dom
                    .parent(node)
                    .is_some_and(|parent| dom.is_element_named(parent, "style")),
            },
            NodeKind::Comment { .. } => return None,
        };

        let node_id = self.mirror.register(node);
        self.serialized.insert(node);
        Some(OpenNode {
            node,
            captured: CapturedNode {
                node_id,
                origin_id: self.origin_of(node),
                data,
            },
            next_child: 0,
            frame_pending: dom.is_element_named(node, "iframe"),
            is_content,
        })
    }

    /// Id of the frame element hosting the document `node` belongs to.
    fn origin_of(&self, node: NodeRef) -> Option<NodeId> {
        let doc = self.dom.owner_document(node)?;
        let host = self.dom.frame_host(doc)?;
        self.mirror.id_of(host)
    }

    /// The nested document of `iframe` if it can be inlined now. Otherwise a
    /// wait is registered and the content arrives as a later attach record.
    fn frame_content(&mut self, iframe: NodeRef) -> Option<NodeRef> {
        let doc = self.dom.frame_document(iframe)?;
        if frame_ready(self.dom, iframe) {
            // inlined here, so an older wait must not attach it again
            self.frames.take(iframe);
            return Some(doc);
        }
        let deadline = Instant::now() + self.config.frame_ready_timeout;
        self.frames.wait(iframe, deadline);
        None
    }
}

/// A node whose children are still being walked.
struct OpenNode {
    node: NodeRef,
    captured: CapturedNode,
    next_child: usize,
    frame_pending: bool,
    /// The nested document of the parent frame element, not a DOM child.
    is_content: bool,
}
