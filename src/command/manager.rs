// CommandManager - Manages undo/redo stacks

use crate::command::trait_def::{CommandError, CommandResult, UndoableCommand};
use crate::config::EditorConfig;
use crate::tree::DocumentTree;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Callback receiving every execute/undo failure before it is returned
pub type ErrorHandler = Box<dyn FnMut(&CommandError)>;

/// Callback receiving the undo/redo availability after every stack change
pub type HistoryListener = Box<dyn FnMut(HistoryState)>;

/// What an editor needs to enable or disable its Undo/Redo controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryState {
    pub can_undo: bool,
    pub can_redo: bool,
}

/// Manages command execution and undo/redo functionality
///
/// The CommandManager maintains two stacks:
/// - Undo stack: Commands that have been executed and can be undone
/// - Redo stack: Commands that have been undone and can be redone
///
/// When a new command is executed:
/// 1. Clear the redo stack (we're on a new timeline)
/// 2. Execute the command
/// 3. Push it onto the undo stack if it succeeded
///
/// Failures are passed to the error handler once and then returned, so
/// the caller can abort whatever user action triggered them.
///
/// # Memory Management
/// With `max_history` set, the oldest command is dropped once the undo
/// stack grows past the limit. By default the history is unbounded.
pub struct CommandManager {
    /// Stack of commands that can be undone (most recent at the back)
    undo_stack: VecDeque<Box<dyn UndoableCommand>>,

    /// Stack of commands that can be redone (most recent at the back)
    redo_stack: VecDeque<Box<dyn UndoableCommand>>,

    /// Maximum number of commands to keep in history
    max_history: Option<usize>,

    error_handler: Option<ErrorHandler>,
    history_listener: Option<HistoryListener>,
}

impl CommandManager {
    /// Create a new CommandManager with an unbounded history
    pub fn new() -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_history: None,
            error_handler: None,
            history_listener: None,
        }
    }

    /// Create a new CommandManager with a custom history limit
    pub fn with_capacity(max_history: usize) -> Self {
        Self {
            undo_stack: VecDeque::with_capacity(max_history),
            redo_stack: VecDeque::with_capacity(max_history),
            max_history: Some(max_history),
            ..Self::new()
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        match config.max_history {
            Some(max_history) => Self::with_capacity(max_history),
            None => Self::new(),
        }
    }

    pub fn set_error_handler(&mut self, handler: impl FnMut(&CommandError) + 'static) {
        self.error_handler = Some(Box::new(handler));
    }

    pub fn set_history_listener(&mut self, listener: impl FnMut(HistoryState) + 'static) {
        self.history_listener = Some(Box::new(listener));
    }

    /// Execute a command and add it to the undo stack
    ///
    /// # Errors
    /// Returns the command's error after reporting it. A failed command is
    /// not recorded, but the redo stack is gone either way.
    pub fn execute(
        &mut self,
        command: Box<dyn UndoableCommand>,
        tree: &mut DocumentTree,
    ) -> CommandResult<()> {
        self.run(command, tree, false)
    }

    fn run(
        &mut self,
        mut command: Box<dyn UndoableCommand>,
        tree: &mut DocumentTree,
        redo: bool,
    ) -> CommandResult<()> {
        // Clear redo stack (we're on a new timeline now)
        if !redo {
            self.redo_stack.clear();
        }

        let description = command.description();
        debug!(command = %description, redo, "execute");
        if let Err(err) = command.execute(tree) {
            warn!(command = %description, error = %err, "command failed");
            self.report(&err);
            self.notify_history();
            return Err(err);
        }

        self.undo_stack.push_back(command);

        // Trim history if needed
        if let Some(max_history) = self.max_history {
            while self.undo_stack.len() > max_history {
                self.undo_stack.pop_front();
            }
        }

        self.notify_history();
        Ok(())
    }

    /// Undo the last command
    ///
    /// Pops the last command from the undo stack, moves it to the redo
    /// stack and undoes it. The command stays on the redo stack even if
    /// undoing it fails.
    ///
    /// # Errors
    /// Returns an error if:
    /// - There are no commands to undo
    /// - The undo operation fails
    pub fn undo(&mut self, tree: &mut DocumentTree) -> CommandResult<String> {
        let mut command = self
            .undo_stack
            .pop_back()
            .ok_or(CommandError::NothingToUndo)?;

        let description = command.description();
        debug!(command = %description, "undo");
        let result = command.undo(tree);

        // Move to redo stack
        self.redo_stack.push_back(command);
        self.notify_history();

        if let Err(err) = result {
            warn!(command = %description, error = %err, "undo failed");
            self.report(&err);
            return Err(err);
        }
        Ok(description)
    }

    /// Redo the last undone command
    ///
    /// Pops the last command from the redo stack and executes it again,
    /// without touching the rest of the redo stack.
    ///
    /// # Errors
    /// Returns an error if:
    /// - There are no commands to redo
    /// - The execution fails
    pub fn redo(&mut self, tree: &mut DocumentTree) -> CommandResult<String> {
        let command = self
            .redo_stack
            .pop_back()
            .ok_or(CommandError::NothingToRedo)?;

        let description = command.description();
        self.run(command, tree, true)?;
        Ok(description)
    }

    /// Forget all history, e.g. when a document is closed without saving
    pub fn reset(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.notify_history();
    }

    /// Whether the document has changes that can be undone
    pub fn is_modified(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get the description of the command that would be undone
    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.back().map(|cmd| cmd.description())
    }

    /// Get the description of the command that would be redone
    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.back().map(|cmd| cmd.description())
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Number of commands held on both stacks
    pub fn len(&self) -> usize {
        self.undo_stack.len() + self.redo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn history_state(&self) -> HistoryState {
        HistoryState {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }

    fn report(&mut self, err: &CommandError) {
        if let Some(handler) = self.error_handler.as_mut() {
            handler(err);
        }
    }

    fn notify_history(&mut self) {
        let state = self.history_state();
        if let Some(listener) = self.history_listener.as_mut() {
            listener(state);
        }
    }
}

impl Default for CommandManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CommandManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandManager")
            .field("undo_count", &self.undo_stack.len())
            .field("redo_count", &self.redo_stack.len())
            .field("max_history", &self.max_history)
            .finish_non_exhaustive()
    }
}
