//! Portable record format.
//!
//! Field names serialize in camelCase so the JSON form reads
//! `{nodeId, originId, type, ...}` for nodes and
//! `{texts, attributes, removes, adds}` for incremental records.

use core_types::ScrollOffset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Session-unique node identity. The first id handed out is 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

pub type Attributes = BTreeMap<String, AttributeValue>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedNode {
    pub node_id: NodeId,
    /// Id of the frame element hosting this node's document, for nested documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<NodeId>,
    #[serde(flatten)]
    pub data: NodeData,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum NodeData {
    Document {
        child_nodes: Vec<CapturedNode>,
    },
    DocumentType {
        name: String,
        public_id: String,
        system_id: String,
    },
    Element {
        tag_name: String,
        attributes: Attributes,
        child_nodes: Vec<CapturedNode>,
        /// Nested document of a frame element; not a DOM child.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_document: Option<Box<CapturedNode>>,
    },
    Text {
        text_content: String,
        is_css_rules: bool,
    },
}

impl CapturedNode {
    pub fn children(&self) -> &[CapturedNode] {
        match &self.data {
            NodeData::Document { child_nodes } | NodeData::Element { child_nodes, .. } => {
                child_nodes
            }
            NodeData::DocumentType { .. } | NodeData::Text { .. } => &[],
        }
    }

    pub fn tag_name(&self) -> Option<&str> {
        match &self.data {
            NodeData::Element { tag_name, .. } => Some(tag_name),
            _ => None,
        }
    }

    pub fn attributes(&self) -> Option<&Attributes> {
        match &self.data {
            NodeData::Element { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    pub fn content_document(&self) -> Option<&CapturedNode> {
        match &self.data {
            NodeData::Element {
                content_document, ..
            } => content_document.as_deref(),
            _ => None,
        }
    }

    /// Depth-first search by id, descending into nested documents.
    pub fn find(&self, id: NodeId) -> Option<&CapturedNode> {
        self.pre_order().find(|node| node.node_id == id)
    }

    /// Ids in pre-order, nested documents included.
    pub fn ids(&self) -> Vec<NodeId> {
        self.pre_order().map(|node| node.node_id).collect()
    }

    /// Children before the nested document of a frame element.
    fn pre_order(&self) -> impl Iterator<Item = &CapturedNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.content_document());
            stack.extend(node.children().iter().rev());
            Some(node)
        })
    }
}

// Deep trees are torn down with a work list instead of nested drop glue.
impl Drop for CapturedNode {
    fn drop(&mut self) {
        let mut detached = Vec::new();
        detach_children(&mut self.data, &mut detached);
        while let Some(mut node) = detached.pop() {
            detach_children(&mut node.data, &mut detached);
        }
    }
}

fn detach_children(data: &mut NodeData, out: &mut Vec<CapturedNode>) {
    match data {
        NodeData::Document { child_nodes } => out.append(child_nodes),
        NodeData::Element {
            child_nodes,
            content_document,
            ..
        } => {
            out.append(child_nodes);
            if let Some(doc) = content_document.take() {
                out.push(*doc);
            }
        }
        NodeData::DocumentType { .. } | NodeData::Text { .. } => {}
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextUpdate {
    pub id: NodeId,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeUpdate {
    pub id: NodeId,
    /// `None` means the attribute was removed.
    pub attributes: BTreeMap<String, Option<String>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedNode {
    pub parent_id: NodeId,
    pub id: NodeId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedNode {
    pub parent_id: NodeId,
    pub next_id: Option<NodeId>,
    pub node: CapturedNode,
}

/// Everything observed between two flushes.
///
/// Every id referenced was tracked by the mirror when the record was built.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IncrementalRecord {
    pub texts: Vec<TextUpdate>,
    pub attributes: Vec<AttributeUpdate>,
    pub removes: Vec<RemovedNode>,
    pub adds: Vec<AddedNode>,
}

impl IncrementalRecord {
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
            && self.attributes.is_empty()
            && self.removes.is_empty()
            && self.adds.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullSnapshot {
    pub node: CapturedNode,
    pub initial_offset: ScrollOffset,
}

/// What a sink receives.
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    Full(FullSnapshot),
    Incremental(IncrementalRecord),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn element(id: u32, tag: &str, children: Vec<CapturedNode>) -> CapturedNode {
        CapturedNode {
            node_id: NodeId(id),
            origin_id: None,
            data: NodeData::Element {
                tag_name: tag.to_string(),
                attributes: Attributes::new(),
                child_nodes: children,
                content_document: None,
            },
        }
    }

    #[test]
    fn element_serializes_with_type_tag_and_camel_case() {
        let mut node = element(2, "div", Vec::new());
        if let NodeData::Element { attributes, .. } = &mut node.data {
            attributes.insert("id".into(), "main".into());
            attributes.insert("_scrollTop".into(), 12.0.into());
            attributes.insert("checked".into(), true.into());
        }
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({
                "nodeId": 2,
                "type": "Element",
                "tagName": "div",
                "attributes": {"_scrollTop": 12.0, "checked": true, "id": "main"},
                "childNodes": [],
            })
        );
    }

    #[test]
    fn text_and_origin_fields() {
        let node = CapturedNode {
            node_id: NodeId(9),
            origin_id: Some(NodeId(4)),
            data: NodeData::Text {
                text_content: "a { color: red }".into(),
                is_css_rules: true,
            },
        };
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({
                "nodeId": 9,
                "originId": 4,
                "type": "Text",
                "textContent": "a { color: red }",
                "isCssRules": true,
            })
        );
    }

    #[test]
    fn incremental_record_shape() {
        let record = IncrementalRecord {
            texts: vec![TextUpdate {
                id: NodeId(3),
                value: "hi".into(),
            }],
            attributes: vec![AttributeUpdate {
                id: NodeId(2),
                attributes: BTreeMap::from([("title".to_string(), None)]),
            }],
            removes: vec![RemovedNode {
                parent_id: NodeId(1),
                id: NodeId(5),
            }],
            adds: vec![AddedNode {
                parent_id: NodeId(1),
                next_id: None,
                node: element(6, "p", Vec::new()),
            }],
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["texts"], json!([{"id": 3, "value": "hi"}]));
        assert_eq!(value["attributes"], json!([{"id": 2, "attributes": {"title": null}}]));
        assert_eq!(value["removes"], json!([{"parentId": 1, "id": 5}]));
        assert_eq!(value["adds"][0]["parentId"], json!(1));
        assert_eq!(value["adds"][0]["nextId"], json!(null));
        assert_eq!(value["adds"][0]["node"]["tagName"], json!("p"));
    }

    #[test]
    fn find_and_ids_walk_nested_documents() {
        let inner_doc = CapturedNode {
            node_id: NodeId(10),
            origin_id: Some(NodeId(3)),
            data: NodeData::Document {
                child_nodes: vec![element(11, "html", Vec::new())],
            },
        };
        let mut iframe = element(3, "iframe", Vec::new());
        if let NodeData::Element {
            content_document, ..
        } = &mut iframe.data
        {
            *content_document = Some(Box::new(inner_doc));
        }
        let root = element(1, "body", vec![element(2, "div", Vec::new()), iframe]);

        assert_eq!(
            root.ids(),
            vec![NodeId(1), NodeId(2), NodeId(3), NodeId(10), NodeId(11)]
        );
        assert_eq!(root.find(NodeId(11)).and_then(|n| n.tag_name()), Some("html"));
        assert!(root.find(NodeId(42)).is_none());
    }

    #[test]
    fn very_deep_trees_search_and_drop() {
        let mut node = element(0, "div", Vec::new());
        for id in 1..100_000 {
            node = element(id, "div", vec![node]);
        }
        assert_eq!(node.find(NodeId(0)).map(|n| n.node_id), Some(NodeId(0)));
        assert_eq!(node.ids().len(), 100_000);
        drop(node);
    }

    #[test]
    fn empty_record() {
        assert!(IncrementalRecord::default().is_empty());
    }
}
