// Command Pattern for Undo/Redo functionality
//
// Every edit an editor makes to a document goes through an UndoableCommand
// so it can be taken back.
//
// Architecture:
// - UndoableCommand trait: apply()/revert() plus execute(), undo(), description()
// - CommandManager: Manages undo/redo stacks and reports failures
// - Concrete commands: ChangeValue, AppendValue, DeleteObject, ReorderObject,
//   CopyObject, MoveObject, ReplaceObject, CopyOrMoveObject, Multiple
//
// Commands hold node ids, not nodes. The tree they run against is passed in
// on every call, and the tree announces each mutation to its observers.

pub mod commands;
pub mod manager;
pub mod trait_def;

pub use commands::{
    AppendValue, ChangeValue, CopyObject, CopyOrMoveObject, DeleteObject, MoveObject, Multiple,
    ReorderObject, ReplaceObject, UndoOrder,
};
pub use manager::{CommandManager, HistoryState};
pub use trait_def::{CommandError, CommandResult, UndoableCommand};
