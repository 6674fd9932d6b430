// UndoableCommand trait definition

use crate::tree::DocumentTree;
use crate::tree::error::TreeError;

/// Result type for command operations
pub type CommandResult<T> = Result<T, CommandError>;

/// Errors that can occur while building, executing or undoing commands
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// A required argument was missing or unusable when the command was built
    #[error("Missing argument: {0}")]
    MissingArgument(String),

    /// The tree refused the mutation
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,
}

/// Trait for commands that support undo/redo
///
/// A command captures everything needed to perform one edit on a
/// `DocumentTree` and to take it back. `apply` stores whatever state
/// `revert` needs; `revert` must be a silent no-op when `apply` never
/// got far enough to store it.
///
/// Callers go through `execute` and `undo`, which wrap `apply`/`revert`
/// with the `on_action` hook. Composite commands that reuse another
/// command's mechanics (see `DeleteObject`) call `apply`/`revert`
/// directly so the inner command's hook does not run.
///
/// # Example
/// ```
/// use odml_editor_core::command::{CommandResult, UndoableCommand};
/// use odml_editor_core::tree::{AttrValue, DocumentTree, Field};
///
/// struct SetAuthor {
///     author: String,
///     old: Option<AttrValue>,
/// }
///
/// impl UndoableCommand for SetAuthor {
///     fn apply(&mut self, tree: &mut DocumentTree) -> CommandResult<()> {
///         let root = tree.root();
///         self.old = Some(tree.get_attr(root, Field::Author)?);
///         tree.set_attr(root, Field::Author, self.author.as_str().into())?;
///         Ok(())
///     }
///
///     fn revert(&mut self, tree: &mut DocumentTree) -> CommandResult<()> {
///         if let Some(old) = self.old.take() {
///             tree.set_attr(tree.root(), Field::Author, old)?;
///         }
///         Ok(())
///     }
///
///     fn description(&self) -> String {
///         format!("Set author to {}", self.author)
///     }
/// }
/// ```
pub trait UndoableCommand: Send {
    /// Perform the edit, remembering what is needed to revert it
    fn apply(&mut self, tree: &mut DocumentTree) -> CommandResult<()>;

    /// Take the edit back
    fn revert(&mut self, tree: &mut DocumentTree) -> CommandResult<()>;

    /// Get a human-readable description of the command
    ///
    /// Used for UI display (e.g., "Undo: Delete section")
    fn description(&self) -> String;

    /// Called after every successful execute or undo
    ///
    /// Default implementation does nothing.
    fn on_action(&mut self, _tree: &DocumentTree, _undo: bool) {}

    /// Run the command
    fn execute(&mut self, tree: &mut DocumentTree) -> CommandResult<()> {
        self.apply(tree)?;
        self.on_action(tree, false);
        Ok(())
    }

    /// Undo the command
    fn undo(&mut self, tree: &mut DocumentTree) -> CommandResult<()> {
        self.revert(tree)?;
        self.on_action(tree, true);
        Ok(())
    }
}
