// Concrete command implementations
//
// Every command works on node handles, never on borrowed nodes, so it can
// sit on the undo stack while the tree keeps changing underneath it.

use crate::command::trait_def::{CommandError, CommandResult, UndoableCommand};
use crate::tree::DocumentTree;
use crate::tree::error::TreeError;
use crate::tree::node::{AttrValue, Field, NodeId};
use tracing::debug;

/// Order in which `Multiple` undoes its commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndoOrder {
    /// Same order as execution
    #[default]
    Forward,
    /// Last executed command is undone first
    Reverse,
}

/// Runs a list of commands as one undo step
pub struct Multiple {
    cmds: Vec<Box<dyn UndoableCommand>>,
    undo_order: UndoOrder,
}

impl Multiple {
    pub fn new(cmds: Vec<Box<dyn UndoableCommand>>) -> Self {
        Self {
            cmds,
            undo_order: UndoOrder::default(),
        }
    }

    pub fn with_undo_order(mut self, undo_order: UndoOrder) -> Self {
        self.undo_order = undo_order;
        self
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }
}

impl UndoableCommand for Multiple {
    fn apply(&mut self, tree: &mut DocumentTree) -> CommandResult<()> {
        for cmd in &mut self.cmds {
            cmd.execute(tree)?;
        }
        Ok(())
    }

    fn revert(&mut self, tree: &mut DocumentTree) -> CommandResult<()> {
        match self.undo_order {
            UndoOrder::Forward => {
                for cmd in self.cmds.iter_mut() {
                    cmd.undo(tree)?;
                }
            }
            UndoOrder::Reverse => {
                for cmd in self.cmds.iter_mut().rev() {
                    cmd.undo(tree)?;
                }
            }
        }
        Ok(())
    }

    fn description(&self) -> String {
        match self.cmds.as_slice() {
            [single] => single.description(),
            cmds => format!("{} changes", cmds.len()),
        }
    }
}

/// Sets an attribute of a node
///
/// When several attributes are given, only the first one is changed but
/// all of them are recorded and restored on undo. This covers attributes
/// that change as a side effect, e.g. the values of a property whose
/// dtype is changed.
pub struct ChangeValue {
    object: NodeId,
    attrs: Vec<Field>,
    new_value: AttrValue,
    old_values: Option<Vec<(Field, AttrValue)>>,
}

impl ChangeValue {
    pub fn new(object: NodeId, attr: Field, new_value: impl Into<AttrValue>) -> Self {
        Self {
            object,
            attrs: vec![attr],
            new_value: new_value.into(),
            old_values: None,
        }
    }

    /// Change `attrs[0]`, restoring all of `attrs` on undo
    pub fn with_attrs(
        object: NodeId,
        attrs: Vec<Field>,
        new_value: impl Into<AttrValue>,
    ) -> CommandResult<Self> {
        if attrs.is_empty() {
            return Err(CommandError::MissingArgument(
                "ChangeValue needs at least one attribute".into(),
            ));
        }
        Ok(Self {
            object,
            attrs,
            new_value: new_value.into(),
            old_values: None,
        })
    }
}

impl UndoableCommand for ChangeValue {
    fn apply(&mut self, tree: &mut DocumentTree) -> CommandResult<()> {
        let old_values = self
            .attrs
            .iter()
            .map(|attr| Ok((*attr, tree.get_attr(self.object, *attr)?)))
            .collect::<CommandResult<Vec<_>>>()?;
        self.old_values = Some(old_values);

        tree.set_attr(self.object, self.attrs[0], self.new_value.clone())?;
        Ok(())
    }

    fn revert(&mut self, tree: &mut DocumentTree) -> CommandResult<()> {
        // Nothing recorded means apply never ran
        let Some(old_values) = &self.old_values else {
            return Ok(());
        };
        for (attr, value) in old_values {
            tree.set_attr(self.object, *attr, value.clone())?;
        }
        Ok(())
    }

    fn description(&self) -> String {
        format!("Change {} to {}", self.attrs[0], self.new_value)
    }
}

/// Appends `val` to the matching child list of `obj`
pub struct AppendValue {
    obj: NodeId,
    val: NodeId,
    index: Option<usize>,
}

impl AppendValue {
    pub fn new(obj: NodeId, val: NodeId) -> Self {
        Self {
            obj,
            val,
            index: None,
        }
    }

    /// Position `val` was (or will be) placed at
    pub fn index(&self) -> Option<usize> {
        self.index
    }
}

impl UndoableCommand for AppendValue {
    fn apply(&mut self, tree: &mut DocumentTree) -> CommandResult<()> {
        let count = tree.child_count_for(self.obj, self.val)?;
        match self.index {
            // A known slot (redo, or undo of a delete) puts the node back where it was
            Some(index) if index <= count => tree.insert(self.obj, index, self.val)?,
            _ => {
                self.index = Some(count);
                tree.append(self.obj, self.val)?;
            }
        }
        Ok(())
    }

    fn revert(&mut self, tree: &mut DocumentTree) -> CommandResult<()> {
        let Some(index) = self.index else {
            return Ok(());
        };
        let list = tree.list_of(self.obj, self.val)?;
        if tree.children(self.obj, list)?.get(index) != Some(&self.val) {
            debug!(obj = %self.obj, val = %self.val, index, "appended node moved, removing by identity");
        }
        tree.remove(self.obj, self.val)?;
        Ok(())
    }

    fn description(&self) -> String {
        "Append".to_string()
    }
}

/// Removes a node from its parent
///
/// This is an `AppendValue` run backwards: removing is its undo, restoring
/// is its execute, so both share the same position bookkeeping.
pub struct DeleteObject {
    append_cmd: AppendValue,
    description: String,
}

impl DeleteObject {
    pub fn new(tree: &DocumentTree, obj: NodeId) -> CommandResult<Self> {
        let parent = tree
            .parent(obj)
            .ok_or_else(|| CommandError::MissingArgument(format!("node {} has no parent", obj)))?;
        let position = tree.position(obj)?;
        let description = format!("Delete {}", tree.kind(obj)?);

        Ok(Self {
            append_cmd: AppendValue {
                obj: parent,
                val: obj,
                index: Some(position),
            },
            description,
        })
    }
}

impl UndoableCommand for DeleteObject {
    fn apply(&mut self, tree: &mut DocumentTree) -> CommandResult<()> {
        self.append_cmd.revert(tree)
    }

    fn revert(&mut self, tree: &mut DocumentTree) -> CommandResult<()> {
        self.append_cmd.apply(tree)
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

/// Moves a node to another position among its siblings
pub struct ReorderObject {
    obj: NodeId,
    new_index: usize,
    old_index: Option<usize>,
}

impl ReorderObject {
    pub fn new(obj: NodeId, new_index: usize) -> Self {
        Self {
            obj,
            new_index,
            old_index: None,
        }
    }
}

impl UndoableCommand for ReorderObject {
    fn apply(&mut self, tree: &mut DocumentTree) -> CommandResult<()> {
        self.old_index = Some(tree.reorder(self.obj, self.new_index)?);
        Ok(())
    }

    fn revert(&mut self, tree: &mut DocumentTree) -> CommandResult<()> {
        if let Some(old_index) = self.old_index {
            tree.reorder(self.obj, old_index)?;
        }
        Ok(())
    }

    fn description(&self) -> String {
        format!("Move to position {}", self.new_index)
    }
}

/// Appends a deep copy of `obj` to `dst`
pub struct CopyObject {
    obj: NodeId,
    dst: NodeId,
    new_obj: Option<NodeId>,
}

impl CopyObject {
    pub fn new(obj: NodeId, dst: NodeId) -> Self {
        Self {
            obj,
            dst,
            new_obj: None,
        }
    }

    /// The copy, once the command has run
    pub fn new_obj(&self) -> Option<NodeId> {
        self.new_obj
    }
}

impl UndoableCommand for CopyObject {
    fn apply(&mut self, tree: &mut DocumentTree) -> CommandResult<()> {
        // Redo puts the same copy back instead of making another one
        let copy = match self.new_obj {
            Some(copy) if tree.contains(copy) && tree.parent(copy).is_none() => copy,
            _ => tree.clone_subtree(self.obj)?,
        };
        self.new_obj = Some(copy);
        tree.append(self.dst, copy)?;
        Ok(())
    }

    fn revert(&mut self, tree: &mut DocumentTree) -> CommandResult<()> {
        if let Some(copy) = self.new_obj {
            if let Some(parent) = tree.parent(copy) {
                tree.remove(parent, copy)?;
            }
        }
        Ok(())
    }

    fn description(&self) -> String {
        "Copy".to_string()
    }
}

/// Takes `obj` from its parent and appends it to `dst`
pub struct MoveObject {
    obj: NodeId,
    dst: NodeId,
    origin: Option<(NodeId, usize)>,
}

impl MoveObject {
    pub fn new(obj: NodeId, dst: NodeId) -> Self {
        Self {
            obj,
            dst,
            origin: None,
        }
    }
}

impl UndoableCommand for MoveObject {
    fn apply(&mut self, tree: &mut DocumentTree) -> CommandResult<()> {
        let parent = tree.parent(self.obj).ok_or(TreeError::Detached(self.obj))?;
        let index = tree.position(self.obj)?;

        // Refuse before detaching anything
        tree.list_of(self.dst, self.obj)?;
        if tree.is_ancestor(self.obj, self.dst) {
            return Err(TreeError::Cycle {
                parent: self.dst,
                child: self.obj,
            }
            .into());
        }

        self.origin = Some((parent, index));
        tree.remove(parent, self.obj)?;
        if let Err(err) = tree.append(self.dst, self.obj) {
            reattach(tree, parent, index, self.obj)?;
            return Err(err.into());
        }
        Ok(())
    }

    fn revert(&mut self, tree: &mut DocumentTree) -> CommandResult<()> {
        let Some((parent, index)) = self.origin else {
            return Ok(());
        };
        if let Some(current) = tree.parent(self.obj) {
            tree.remove(current, self.obj)?;
        }
        reattach(tree, parent, index, self.obj)
    }

    fn description(&self) -> String {
        "Move".to_string()
    }
}

/// Puts `repl` in the place of `obj`
///
/// `repl` must be detached, typically a fresh clone. Running the command
/// twice restores the original state, so undo simply runs it again.
pub struct ReplaceObject {
    obj: NodeId,
    repl: NodeId,
    origin: Option<(NodeId, usize)>,
}

impl ReplaceObject {
    pub fn new(tree: &DocumentTree, obj: NodeId, repl: NodeId) -> CommandResult<Self> {
        if tree.parent(obj).is_none() {
            return Err(CommandError::MissingArgument(format!(
                "node {} has no parent to be replaced in",
                obj
            )));
        }
        if tree.parent(repl).is_some() {
            return Err(TreeError::AlreadyAttached(repl).into());
        }
        Ok(Self {
            obj,
            repl,
            origin: None,
        })
    }

    /// The node currently in the tree
    pub fn current(&self) -> NodeId {
        self.obj
    }
}

impl UndoableCommand for ReplaceObject {
    fn apply(&mut self, tree: &mut DocumentTree) -> CommandResult<()> {
        let parent = tree.parent(self.obj).ok_or(TreeError::Detached(self.obj))?;
        let index = tree.position(self.obj)?;
        tree.list_of(parent, self.repl)?;

        tree.remove(parent, self.obj)?;
        std::mem::swap(&mut self.obj, &mut self.repl);
        self.origin = Some((parent, index));
        reattach(tree, parent, index, self.obj)
    }

    fn revert(&mut self, tree: &mut DocumentTree) -> CommandResult<()> {
        if self.origin.is_none() {
            return Ok(());
        }
        self.apply(tree)
    }

    fn description(&self) -> String {
        "Replace".to_string()
    }
}

/// Copies or moves `obj` to `dst` depending on `copy`
pub struct CopyOrMoveObject {
    cmd: Box<dyn UndoableCommand>,
}

impl CopyOrMoveObject {
    pub fn new(obj: NodeId, dst: NodeId, copy: bool) -> Self {
        let cmd: Box<dyn UndoableCommand> = if copy {
            Box::new(CopyObject::new(obj, dst))
        } else {
            Box::new(MoveObject::new(obj, dst))
        };
        Self { cmd }
    }
}

impl UndoableCommand for CopyOrMoveObject {
    fn apply(&mut self, tree: &mut DocumentTree) -> CommandResult<()> {
        self.cmd.execute(tree)
    }

    fn revert(&mut self, tree: &mut DocumentTree) -> CommandResult<()> {
        self.cmd.undo(tree)
    }

    fn description(&self) -> String {
        self.cmd.description()
    }
}

/// Insert at `index`, or append when the list has become too short
fn reattach(tree: &mut DocumentTree, parent: NodeId, index: usize, obj: NodeId) -> CommandResult<()> {
    match tree.insert(parent, index, obj) {
        Err(TreeError::IndexOutOfRange { .. }) => tree.append(parent, obj)?,
        other => other?,
    }
    Ok(())
}
