use crate::node::NodeRef;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomError {
    MissingNode(NodeRef),
    InvalidParent(NodeRef),
    NotAChild { parent: NodeRef, child: NodeRef },
    InvalidSibling { parent: NodeRef, before: NodeRef },
    CycleDetected { parent: NodeRef, child: NodeRef },
    WrongNodeKind(NodeRef),
}

impl fmt::Display for DomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomError::MissingNode(node) => write!(f, "unknown node {node:?}"),
            DomError::InvalidParent(node) => write!(f, "node {node:?} cannot have children"),
            DomError::NotAChild { parent, child } => {
                write!(f, "node {child:?} is not a child of {parent:?}")
            }
            DomError::InvalidSibling { parent, before } => {
                write!(f, "reference node {before:?} is not a child of {parent:?}")
            }
            DomError::CycleDetected { parent, child } => {
                write!(f, "inserting {child:?} under {parent:?} would create a cycle")
            }
            DomError::WrongNodeKind(node) => {
                write!(f, "operation not supported on node {node:?}")
            }
        }
    }
}

impl std::error::Error for DomError {}
