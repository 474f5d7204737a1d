use crate::error::DomError;
use crate::live::LiveState;
use crate::mutation::MutationRecord;
use crate::node::{NodeKind, NodeRef, ReadyState};
use core_types::{Rect, ScrollOffset};
use std::collections::HashMap;

struct NodeRecord {
    kind: NodeKind,
    owner: NodeRef,
    parent: Option<NodeRef>,
    children: Vec<NodeRef>,
    live: LiveState,
}

/// Arena holding a top-level document and any nested frame documents.
///
/// Invariants:
/// - A node has at most one parent and appears at most once in its parent's
///   child list.
/// - Documents are always roots.
/// - Records are queued only when the mutation target is connected, i.e. its
///   root is a document.
pub struct Dom {
    nodes: Vec<NodeRecord>,
    root: NodeRef,
    frames: HashMap<NodeRef, NodeRef>,
    frame_hosts: HashMap<NodeRef, NodeRef>,
    stylesheets: HashMap<String, String>,
    records: Vec<MutationRecord>,
}

impl Dom {
    /// Create a host with an empty, fully loaded top-level document.
    pub fn new(url: &str) -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            root: NodeRef(0),
            frames: HashMap::new(),
            frame_hosts: HashMap::new(),
            stylesheets: HashMap::new(),
            records: Vec::new(),
        };
        let root = dom.create_document(url);
        dom.root = root;
        if let NodeKind::Document { ready_state, .. } = &mut dom.nodes[root.index()].kind {
            *ready_state = ReadyState::Complete;
        }
        dom
    }

    /// The top-level document.
    pub fn document(&self) -> NodeRef {
        self.root
    }

    // ---- node creation ----

    /// Create a standalone document, e.g. the content of a frame.
    pub fn create_document(&mut self, url: &str) -> NodeRef {
        let node = NodeRef(self.nodes.len() as u32);
        self.nodes.push(NodeRecord {
            kind: NodeKind::Document {
                url: url.to_string(),
                ready_state: ReadyState::Loading,
            },
            owner: node,
            parent: None,
            children: Vec::new(),
            live: LiveState::default(),
        });
        node
    }

    pub fn create_doctype(
        &mut self,
        doc: NodeRef,
        name: &str,
        public_id: &str,
        system_id: &str,
    ) -> NodeRef {
        self.alloc(
            doc,
            NodeKind::Doctype {
                name: name.to_string(),
                public_id: public_id.to_string(),
                system_id: system_id.to_string(),
            },
        )
    }

    pub fn create_element(&mut self, doc: NodeRef, name: &str) -> NodeRef {
        self.create_element_with(doc, name, &[])
    }

    /// Create a detached element with initial attributes. No records are queued.
    pub fn create_element_with(
        &mut self,
        doc: NodeRef,
        name: &str,
        attributes: &[(&str, &str)],
    ) -> NodeRef {
        let attributes = attributes
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
            .collect();
        self.alloc(
            doc,
            NodeKind::Element {
                name: name.to_ascii_lowercase(),
                attributes,
            },
        )
    }

    pub fn create_text(&mut self, doc: NodeRef, text: &str) -> NodeRef {
        self.alloc(
            doc,
            NodeKind::Text {
                text: text.to_string(),
            },
        )
    }

    pub fn create_comment(&mut self, doc: NodeRef, text: &str) -> NodeRef {
        self.alloc(
            doc,
            NodeKind::Comment {
                text: text.to_string(),
            },
        )
    }

    fn alloc(&mut self, doc: NodeRef, kind: NodeKind) -> NodeRef {
        let owner = self.owner_document(doc).unwrap_or(self.root);
        let node = NodeRef(self.nodes.len() as u32);
        self.nodes.push(NodeRecord {
            kind,
            owner,
            parent: None,
            children: Vec::new(),
            live: LiveState::default(),
        });
        node
    }

    // ---- tree mutation ----

    pub fn append_child(&mut self, parent: NodeRef, child: NodeRef) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `before` (or last when `None`).
    ///
    /// A child that already has a parent is moved: the removal from its old
    /// parent is observed before the insertion.
    pub fn insert_before(
        &mut self,
        parent: NodeRef,
        child: NodeRef,
        before: Option<NodeRef>,
    ) -> Result<(), DomError> {
        let parent_record = self.record(parent)?;
        if !parent_record.kind.allows_children() {
            return Err(DomError::InvalidParent(parent));
        }
        if matches!(self.record(child)?.kind, NodeKind::Document { .. }) {
            return Err(DomError::WrongNodeKind(child));
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(DomError::CycleDetected { parent, child });
        }
        if let Some(before) = before {
            if self.record(before)?.parent != Some(parent) {
                return Err(DomError::InvalidSibling { parent, before });
            }
            if before == child {
                return Ok(());
            }
        }

        self.detach(child);

        let siblings = &mut self.nodes[parent.index()].children;
        let pos = before
            .and_then(|b| siblings.iter().position(|k| *k == b))
            .unwrap_or(siblings.len());
        siblings.insert(pos, child);
        self.nodes[child.index()].parent = Some(parent);

        if self.is_connected(parent) {
            self.queue(MutationRecord::ChildList {
                target: parent,
                added: vec![child],
                removed: Vec::new(),
            });
        }
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeRef, child: NodeRef) -> Result<(), DomError> {
        self.record(parent)?;
        if self.record(child)?.parent != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.detach(child);
        Ok(())
    }

    /// Detach `node` from its parent, if it has one.
    pub fn remove(&mut self, node: NodeRef) -> Result<(), DomError> {
        self.record(node)?;
        self.detach(node);
        Ok(())
    }

    fn detach(&mut self, child: NodeRef) {
        let Some(old_parent) = self.nodes[child.index()].parent.take() else {
            return;
        };
        self.nodes[old_parent.index()]
            .children
            .retain(|k| *k != child);
        if self.is_connected(old_parent) {
            self.queue(MutationRecord::ChildList {
                target: old_parent,
                added: Vec::new(),
                removed: vec![child],
            });
        }
    }

    pub fn set_attribute(&mut self, node: NodeRef, name: &str, value: &str) -> Result<(), DomError> {
        let connected = self.is_connected(node);
        let name = name.to_ascii_lowercase();
        let NodeKind::Element { attributes, .. } = &mut self.record_mut(node)?.kind else {
            return Err(DomError::WrongNodeKind(node));
        };
        let old_value = match attributes.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, value.to_string())),
            None => {
                attributes.push((name.clone(), value.to_string()));
                None
            }
        };
        if connected {
            self.queue(MutationRecord::Attributes {
                target: node,
                name,
                old_value,
            });
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, node: NodeRef, name: &str) -> Result<(), DomError> {
        let connected = self.is_connected(node);
        let name = name.to_ascii_lowercase();
        let NodeKind::Element { attributes, .. } = &mut self.record_mut(node)?.kind else {
            return Err(DomError::WrongNodeKind(node));
        };
        let Some(pos) = attributes.iter().position(|(k, _)| *k == name) else {
            return Ok(());
        };
        let (_, old_value) = attributes.remove(pos);
        if connected {
            self.queue(MutationRecord::Attributes {
                target: node,
                name,
                old_value: Some(old_value),
            });
        }
        Ok(())
    }

    /// Replace the data of a text or comment node.
    pub fn set_text(&mut self, node: NodeRef, text: &str) -> Result<(), DomError> {
        let connected = self.is_connected(node);
        let old_value = match &mut self.record_mut(node)?.kind {
            NodeKind::Text { text: existing } | NodeKind::Comment { text: existing } => {
                std::mem::replace(existing, text.to_string())
            }
            _ => return Err(DomError::WrongNodeKind(node)),
        };
        if connected {
            self.queue(MutationRecord::CharacterData {
                target: node,
                old_value: Some(old_value),
            });
        }
        Ok(())
    }

    fn queue(&mut self, record: MutationRecord) {
        log::trace!(target: "dom.observer", "queued {record:?}");
        self.records.push(record);
    }

    /// Drain every record queued since the last call, in delivery order.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn pending_records(&self) -> &[MutationRecord] {
        &self.records
    }

    // ---- queries ----

    fn record(&self, node: NodeRef) -> Result<&NodeRecord, DomError> {
        self.nodes
            .get(node.index())
            .ok_or(DomError::MissingNode(node))
    }

    fn record_mut(&mut self, node: NodeRef) -> Result<&mut NodeRecord, DomError> {
        self.nodes
            .get_mut(node.index())
            .ok_or(DomError::MissingNode(node))
    }

    pub fn kind(&self, node: NodeRef) -> Option<&NodeKind> {
        self.nodes.get(node.index()).map(|r| &r.kind)
    }

    pub fn parent(&self, node: NodeRef) -> Option<NodeRef> {
        self.nodes.get(node.index()).and_then(|r| r.parent)
    }

    pub fn children(&self, node: NodeRef) -> &[NodeRef] {
        self.nodes
            .get(node.index())
            .map(|r| r.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn next_sibling(&self, node: NodeRef) -> Option<NodeRef> {
        let siblings = self.children(self.parent(node)?);
        let pos = siblings.iter().position(|k| *k == node)?;
        siblings.get(pos + 1).copied()
    }

    pub fn previous_sibling(&self, node: NodeRef) -> Option<NodeRef> {
        let siblings = self.children(self.parent(node)?);
        let pos = siblings.iter().position(|k| *k == node)?;
        pos.checked_sub(1).map(|p| siblings[p])
    }

    /// Lowercase tag name for elements.
    pub fn tag_name(&self, node: NodeRef) -> Option<&str> {
        match self.kind(node)? {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_element_named(&self, node: NodeRef, name: &str) -> bool {
        self.tag_name(node).is_some_and(|n| n == name)
    }

    pub fn attribute(&self, node: NodeRef, name: &str) -> Option<&str> {
        self.attributes(node)
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attribute(&self, node: NodeRef, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    pub fn attributes(&self, node: NodeRef) -> &[(String, String)] {
        match self.kind(node) {
            Some(NodeKind::Element { attributes, .. }) => attributes,
            _ => &[],
        }
    }

    /// Data of a text or comment node.
    pub fn text(&self, node: NodeRef) -> Option<&str> {
        match self.kind(node)? {
            NodeKind::Text { text } | NodeKind::Comment { text } => Some(text),
            _ => None,
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, node: NodeRef) -> String {
        fn walk(dom: &Dom, node: NodeRef, out: &mut String) {
            match dom.kind(node) {
                Some(NodeKind::Text { text }) => out.push_str(text),
                Some(NodeKind::Element { .. }) | Some(NodeKind::Document { .. }) => {
                    for child in dom.children(node) {
                        walk(dom, *child, out);
                    }
                }
                _ => {}
            }
        }
        let mut out = String::new();
        walk(self, node, &mut out);
        out
    }

    pub fn has_class(&self, node: NodeRef, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|v| v.split_whitespace().any(|c| c == class))
    }

    pub fn owner_document(&self, node: NodeRef) -> Option<NodeRef> {
        self.nodes.get(node.index()).map(|r| r.owner)
    }

    /// Topmost ancestor (or the node itself).
    pub fn root_of(&self, node: NodeRef) -> NodeRef {
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Whether the node is part of a document tree.
    pub fn is_connected(&self, node: NodeRef) -> bool {
        matches!(
            self.kind(self.root_of(node)),
            Some(NodeKind::Document { .. })
        )
    }

    /// Inclusive containment: `node` is `ancestor` or one of its descendants.
    pub fn contains(&self, ancestor: NodeRef, node: NodeRef) -> bool {
        ancestor == node || self.is_ancestor(ancestor, node)
    }

    fn is_ancestor(&self, ancestor: NodeRef, node: NodeRef) -> bool {
        let mut current = self.parent(node);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    // ---- documents and frames ----

    pub fn document_url(&self, doc: NodeRef) -> Option<&str> {
        match self.kind(doc)? {
            NodeKind::Document { url, .. } => Some(url),
            _ => None,
        }
    }

    pub fn set_document_url(&mut self, doc: NodeRef, new_url: &str) -> Result<(), DomError> {
        match &mut self.record_mut(doc)?.kind {
            NodeKind::Document { url, .. } => {
                *url = new_url.to_string();
                Ok(())
            }
            _ => Err(DomError::WrongNodeKind(doc)),
        }
    }

    pub fn ready_state(&self, doc: NodeRef) -> Option<ReadyState> {
        match self.kind(doc)? {
            NodeKind::Document { ready_state, .. } => Some(*ready_state),
            _ => None,
        }
    }

    pub fn set_ready_state(&mut self, doc: NodeRef, state: ReadyState) -> Result<(), DomError> {
        match &mut self.record_mut(doc)?.kind {
            NodeKind::Document { ready_state, .. } => {
                *ready_state = state;
                Ok(())
            }
            _ => Err(DomError::WrongNodeKind(doc)),
        }
    }

    /// Make `doc` the content document of `frame`, replacing any previous one.
    pub fn attach_frame(&mut self, frame: NodeRef, doc: NodeRef) -> Result<(), DomError> {
        if self.tag_name(frame).is_none() {
            return Err(DomError::WrongNodeKind(frame));
        }
        if self.document_url(doc).is_none() {
            return Err(DomError::WrongNodeKind(doc));
        }
        if let Some(previous) = self.frames.insert(frame, doc) {
            self.frame_hosts.remove(&previous);
        }
        self.frame_hosts.insert(doc, frame);
        Ok(())
    }

    pub fn frame_document(&self, frame: NodeRef) -> Option<NodeRef> {
        self.frames.get(&frame).copied()
    }

    /// The frame element hosting `doc`, if it is a nested document.
    pub fn frame_host(&self, doc: NodeRef) -> Option<NodeRef> {
        self.frame_hosts.get(&doc).copied()
    }

    // ---- live state ----

    pub fn scroll(&self, node: NodeRef) -> ScrollOffset {
        self.nodes
            .get(node.index())
            .map(|r| r.live.scroll)
            .unwrap_or_default()
    }

    pub fn set_scroll(&mut self, node: NodeRef, offset: ScrollOffset) -> Result<(), DomError> {
        self.record_mut(node)?.live.scroll = offset;
        Ok(())
    }

    pub fn rect(&self, node: NodeRef) -> Option<Rect> {
        self.nodes.get(node.index()).and_then(|r| r.live.rect)
    }

    pub fn set_rect(&mut self, node: NodeRef, rect: Rect) -> Result<(), DomError> {
        self.record_mut(node)?.live.rect = Some(rect);
        Ok(())
    }

    /// Current value of a form control.
    ///
    /// Falls back to the markup: the `value` attribute for inputs and options,
    /// the text for textareas, the selected option for selects.
    pub fn value(&self, node: NodeRef) -> String {
        let Some(record) = self.nodes.get(node.index()) else {
            return String::new();
        };
        if let Some(value) = &record.live.value {
            return value.clone();
        }
        match self.tag_name(node) {
            Some("select") => self.select_value(node),
            Some("textarea") => self.text_content(node),
            Some("option") => self.option_value(node),
            _ => self.attribute(node, "value").unwrap_or_default().to_string(),
        }
    }

    pub fn set_value(&mut self, node: NodeRef, value: &str) -> Result<(), DomError> {
        self.record_mut(node)?.live.value = Some(value.to_string());
        Ok(())
    }

    pub fn checked(&self, node: NodeRef) -> bool {
        match self.nodes.get(node.index()).and_then(|r| r.live.checked) {
            Some(checked) => checked,
            None => self.has_attribute(node, "checked"),
        }
    }

    pub fn set_checked(&mut self, node: NodeRef, checked: bool) -> Result<(), DomError> {
        self.record_mut(node)?.live.checked = Some(checked);
        Ok(())
    }

    pub fn selected(&self, node: NodeRef) -> bool {
        match self.nodes.get(node.index()).and_then(|r| r.live.selected) {
            Some(selected) => selected,
            None => self.has_attribute(node, "selected"),
        }
    }

    pub fn set_selected(&mut self, node: NodeRef, selected: bool) -> Result<(), DomError> {
        self.record_mut(node)?.live.selected = Some(selected);
        Ok(())
    }

    fn option_value(&self, option: NodeRef) -> String {
        match self.attribute(option, "value") {
            Some(value) => value.to_string(),
            None => self.text_content(option),
        }
    }

    fn select_value(&self, select: NodeRef) -> String {
        let mut options = Vec::new();
        self.collect_options(select, &mut options);
        options
            .iter()
            .find(|o| self.selected(**o))
            .or_else(|| options.first())
            .map(|o| self.option_value(*o))
            .unwrap_or_default()
    }

    fn collect_options(&self, node: NodeRef, out: &mut Vec<NodeRef>) {
        for child in self.children(node) {
            if self.is_element_named(*child, "option") {
                out.push(*child);
            } else if self.is_element_named(*child, "optgroup") {
                self.collect_options(*child, out);
            }
        }
    }

    pub fn canvas_data_url(&self, node: NodeRef) -> Option<&str> {
        self.nodes
            .get(node.index())
            .and_then(|r| r.live.canvas_data_url.as_deref())
    }

    pub fn set_canvas_data_url(&mut self, node: NodeRef, data_url: &str) -> Result<(), DomError> {
        self.record_mut(node)?.live.canvas_data_url = Some(data_url.to_string());
        Ok(())
    }

    /// Media playback state; media starts paused.
    pub fn paused(&self, node: NodeRef) -> bool {
        self.nodes.get(node.index()).is_none_or(|r| r.live.paused)
    }

    pub fn set_paused(&mut self, node: NodeRef, paused: bool) -> Result<(), DomError> {
        self.record_mut(node)?.live.paused = paused;
        Ok(())
    }

    /// Parsed rules of a `<style>` element, as the host's CSSOM reports them.
    pub fn sheet(&self, node: NodeRef) -> Option<&str> {
        self.nodes
            .get(node.index())
            .and_then(|r| r.live.sheet.as_deref())
    }

    pub fn set_sheet(&mut self, node: NodeRef, css: &str) -> Result<(), DomError> {
        self.record_mut(node)?.live.sheet = Some(css.to_string());
        Ok(())
    }

    /// Register the rules of a loaded external stylesheet by absolute URL.
    pub fn register_stylesheet(&mut self, href: &str, css: &str) {
        self.stylesheets.insert(href.to_string(), css.to_string());
    }

    pub fn stylesheet(&self, href: &str) -> Option<&str> {
        self.stylesheets.get(href).map(String::as_str)
    }
}
