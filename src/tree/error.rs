// Errors raised by tree mutations and change observers

use crate::tree::dtype::DType;
use crate::tree::node::{Field, NodeId, NodeKind};

pub type TreeResult<T> = Result<T, TreeError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node {id} is a {found}, expected a {expected}")]
    WrongKind {
        id: NodeId,
        expected: NodeKind,
        found: NodeKind,
    },

    #[error("A {parent} cannot hold a {child}")]
    InvalidChild { parent: NodeKind, child: NodeKind },

    #[error("Node {0} already has a parent")]
    AlreadyAttached(NodeId),

    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("Node {0} has no parent")]
    Detached(NodeId),

    #[error("Moving {child} below {parent} would make it its own ancestor")]
    Cycle { parent: NodeId, child: NodeId },

    #[error("Index {index} out of range for a list of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("A {kind} has no field '{field}'")]
    UnsupportedField { kind: NodeKind, field: Field },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: Field, reason: String },

    #[error("Cannot read '{text}' as {dtype}")]
    TypeMismatch { dtype: DType, text: String },

    #[error("Unknown dtype '{0}'")]
    UnknownDType(String),

    /// Raised by a change handler to abort the mutation in progress
    #[error("Change observer failed: {0}")]
    Observer(String),
}
