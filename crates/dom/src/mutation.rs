use crate::node::NodeRef;

/// One observed change, in the shape a mutation observer delivers it.
///
/// Records are only produced for targets connected to a document. Old values
/// are always captured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationRecord {
    CharacterData {
        target: NodeRef,
        old_value: Option<String>,
    },
    Attributes {
        target: NodeRef,
        name: String,
        old_value: Option<String>,
    },
    ChildList {
        target: NodeRef,
        added: Vec<NodeRef>,
        removed: Vec<NodeRef>,
    },
}

impl MutationRecord {
    pub fn target(&self) -> NodeRef {
        match self {
            MutationRecord::CharacterData { target, .. }
            | MutationRecord::Attributes { target, .. }
            | MutationRecord::ChildList { target, .. } => *target,
        }
    }
}
