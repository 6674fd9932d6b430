// Change events: observer lists and the context handed to observers
//
// One logical mutation produces one `ChangeContext` which is passed up the
// tree twice, once before the mutation (pre_change) and once after it
// (post_change). The context records which nodes it has visited so an
// observer on an outer node can tell where the change started.

use crate::tree::DocumentTree;
use crate::tree::error::TreeResult;
use crate::tree::node::{AttrValue, ChildList, Field, NodeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Observer callback
///
/// Handlers see the tree read-only. Returning an error aborts the mutation
/// that is being announced.
pub type ChangeHandler = Rc<dyn Fn(&ChangeContext, &DocumentTree) -> TreeResult<()>>;

/// Ordered, duplicate-free list of change handlers
#[derive(Clone, Default)]
pub struct Event {
    name: String,
    handlers: Vec<ChangeHandler>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: Vec::new(),
        }
    }

    /// Register `handler` unless it is already registered
    pub fn add_handler(&mut self, handler: ChangeHandler) -> &mut Self {
        if !self.contains(&handler) {
            self.handlers.push(handler);
        }
        self
    }

    pub fn remove_handler(&mut self, handler: &ChangeHandler) -> &mut Self {
        self.handlers.retain(|h| !same_handler(h, handler));
        self
    }

    pub fn contains(&self, handler: &ChangeHandler) -> bool {
        self.handlers.iter().any(|h| same_handler(h, handler))
    }

    /// Call every handler in registration order; the first error stops the chain
    pub fn fire(&self, context: &ChangeContext, tree: &DocumentTree) -> TreeResult<()> {
        for handler in &self.handlers {
            handler(context, tree)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}Event handlers={}>", self.name, self.handlers.len())
    }
}

fn same_handler(a: &ChangeHandler, b: &ChangeHandler) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Set,
    Append,
    Insert,
    Remove,
    Reorder,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Set => "set",
            Action::Append => "append",
            Action::Insert => "insert",
            Action::Remove => "remove",
            Action::Reorder => "reorder",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PreChange,
    PostChange,
}

/// Action specific data of a change
#[derive(Debug, Clone, PartialEq)]
pub enum ChangePayload {
    /// `set`: the attribute and the value it is about to get (or got)
    Set { field: Field, value: AttrValue },
    /// `append`, `insert` and `remove`: the child that moves
    Child(NodeId),
    /// `reorder`: the list being reordered and the requested position
    Reorder { list: ChildList, new_index: usize },
}

/// Describes one logical mutation while it is announced to observers
///
/// The same context is used for the pre-change and the post-change pass,
/// so information stashed during the first pass is still there in the
/// second one even if the tree no longer holds it.
#[derive(Debug)]
pub struct ChangeContext {
    action: Action,
    val: ChangePayload,
    origin: NodeId,
    stack: Vec<NodeId>,
    phase: Option<Phase>,
    scratch: RefCell<HashMap<String, serde_json::Value>>,
}

impl ChangeContext {
    pub fn new(origin: NodeId, action: Action, val: ChangePayload) -> Self {
        Self {
            action,
            val,
            origin,
            stack: Vec::new(),
            phase: None,
            scratch: RefCell::new(HashMap::new()),
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn val(&self) -> &ChangePayload {
        &self.val
    }

    /// Node the mutation happens on
    pub fn obj(&self) -> NodeId {
        self.origin
    }

    /// Node currently receiving the event
    pub fn cur(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(self.origin)
    }

    pub fn pre_change(&self) -> bool {
        self.phase == Some(Phase::PreChange)
    }

    pub fn post_change(&self) -> bool {
        self.phase == Some(Phase::PostChange)
    }

    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = Some(phase);
    }

    /// Nodes visited so far, origin first
    pub fn stack(&self) -> &[NodeId] {
        &self.stack
    }

    /// The first `count` entries of the pass stack
    ///
    /// A shorter stack is padded with `None` at the front, so an observer
    /// on a section can always destructure `[value, property, section]`
    /// whether the change started at a value or at the property itself.
    pub fn get_stack(&self, count: usize) -> Vec<Option<NodeId>> {
        if self.stack.len() < count {
            let padding = count - self.stack.len();
            std::iter::repeat_n(None, padding)
                .chain(self.stack.iter().copied().map(Some))
                .collect()
        } else {
            self.stack[..count].iter().copied().map(Some).collect()
        }
    }

    pub(crate) fn push(&mut self, id: NodeId) {
        self.stack.push(id);
    }

    pub(crate) fn pop(&mut self) {
        self.stack.pop();
    }

    pub(crate) fn reset(&mut self) {
        self.stack.clear();
    }

    /// Keep a value around until the post-change pass
    pub fn stash(&self, key: impl Into<String>, value: serde_json::Value) {
        self.scratch.borrow_mut().insert(key.into(), value);
    }

    pub fn stashed(&self, key: &str) -> Option<serde_json::Value> {
        self.scratch.borrow().get(key).cloned()
    }
}

impl fmt::Display for ChangeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.phase {
            Some(Phase::PreChange) => "Pre",
            Some(Phase::PostChange) => "Post",
            None => "",
        };
        write!(f, "<{}Change {}.{}({:?})>", phase, self.origin, self.action, self.val)
    }
}
