// odML editor core - Library exports
//
// Undo/redo commands over an odML document tree that notifies observers
// of every change.

pub mod command;
pub mod config;
pub mod tree;

// Re-export commonly used types for convenience
pub use command::{CommandError, CommandManager, UndoableCommand};
pub use config::{EditorConfig, SectionPropagation};
pub use tree::DocumentTree;
pub use tree::error::TreeError;
pub use tree::node::{NodeId, NodeKind};
