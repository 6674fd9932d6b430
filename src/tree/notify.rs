// Notifying mutation primitives
//
// Every change to the tree is announced twice: a pre-change pass before the
// data is touched and a post-change pass afterwards. Both passes start at
// the node the change happens on and climb the tree:
//
//   value    -> owning property
//   property -> owning section
//   section  -> owning document (or every ancestor, see SectionPropagation)
//   document -> stop
//
// At each level the node's own handlers run first, then the handlers
// registered for its kind. Preconditions are checked before the pre-change
// pass so observers never hear about a change that cannot happen.

use crate::config::SectionPropagation;
use crate::tree::DocumentTree;
use crate::tree::dtype::Scalar;
use crate::tree::error::{TreeError, TreeResult};
use crate::tree::event::{Action, ChangeContext, ChangeHandler, ChangePayload, Event, Phase};
use crate::tree::node::{AttrValue, ChildList, Field, ListKind, Node, NodeId, NodeKind};
use tracing::{debug, trace};

impl DocumentTree {
    /// Register `handler` for changes on `id` and anything bubbling through it
    pub fn add_change_handler(&mut self, id: NodeId, handler: ChangeHandler) -> TreeResult<()> {
        let kind = self.kind(id)?;
        self.handlers
            .entry(id)
            .or_insert_with(|| Event::new(kind.to_string()))
            .add_handler(handler);
        Ok(())
    }

    /// Unregister `handler`; the node's event is dropped once it is empty
    pub fn remove_change_handler(&mut self, id: NodeId, handler: &ChangeHandler) {
        if let Some(event) = self.handlers.get_mut(&id) {
            event.remove_handler(handler);
            if event.is_empty() {
                self.handlers.remove(&id);
            }
        }
    }

    pub fn change_handler_count(&self, id: NodeId) -> usize {
        self.handlers.get(&id).map_or(0, Event::len)
    }

    /// Register `handler` for every node of `kind`
    pub fn add_kind_handler(&mut self, kind: NodeKind, handler: ChangeHandler) {
        self.kind_events
            .entry(kind)
            .or_insert_with(|| Event::new(kind.to_string()))
            .add_handler(handler);
    }

    pub fn remove_kind_handler(&mut self, kind: NodeKind, handler: &ChangeHandler) {
        if let Some(event) = self.kind_events.get_mut(&kind) {
            event.remove_handler(handler);
        }
    }

    /// Read an attribute
    pub fn get_attr(&self, id: NodeId, field: Field) -> TreeResult<AttrValue> {
        let node = self.node(id)?;
        match (node, field) {
            (Node::Property(prop), Field::Dtype) => Ok(AttrValue::Dtype(prop.dtype)),
            (Node::Property(prop), Field::Values) => Ok(AttrValue::Values(prop.values.clone())),
            (Node::Value(_), Field::Value) => Ok(AttrValue::Scalar(self.value_of(id)?.clone())),
            _ => node.plain_attr(field),
        }
    }

    /// Assign an attribute, announcing a `set` change around the assignment
    pub fn set_attr(&mut self, id: NodeId, field: Field, value: AttrValue) -> TreeResult<()> {
        let kind = self.kind(id)?;
        let value = self.prepare_set(id, kind, field, value)?;
        debug!(node = %id, %kind, %field, %value, "set attribute");

        let payload = ChangePayload::Set {
            field,
            value: value.clone(),
        };
        self.fire_change(id, Action::Set, payload, move |tree| {
            tree.assign(id, field, value)
        })
    }

    /// Validate and normalise a value before any observer hears about it
    fn prepare_set(
        &self,
        id: NodeId,
        kind: NodeKind,
        field: Field,
        value: AttrValue,
    ) -> TreeResult<AttrValue> {
        match (kind, field) {
            (NodeKind::Value, Field::Value) => {
                let dtype = match self.parent(id) {
                    Some(prop) => self.property(prop)?.dtype,
                    None => return Ok(AttrValue::Scalar(scalar_from(field, value)?)),
                };
                let scalar = match value {
                    AttrValue::Text(Some(text)) => dtype.parse(&text)?,
                    other => dtype.convert(&scalar_from(field, other)?)?,
                };
                Ok(AttrValue::Scalar(scalar))
            }
            (NodeKind::Property, Field::Dtype) => {
                let dtype = match value {
                    AttrValue::Dtype(dtype) => dtype,
                    AttrValue::Text(Some(text)) => text.parse()?,
                    other => return Err(invalid(field, "expected a dtype", &other)),
                };
                // Fail now if the existing values cannot follow
                for scalar in &self.property(id)?.values {
                    dtype.convert(scalar)?;
                }
                Ok(AttrValue::Dtype(dtype))
            }
            (NodeKind::Property, Field::Values) => {
                let dtype = self.property(id)?.dtype;
                let values = match value {
                    AttrValue::Values(values) => values,
                    other => return Err(invalid(field, "expected a list of values", &other)),
                };
                let values = values
                    .iter()
                    .map(|v| dtype.convert(v))
                    .collect::<TreeResult<Vec<_>>>()?;
                Ok(AttrValue::Values(values))
            }
            _ => {
                self.node(id)?.check_plain(field, &value)?;
                Ok(value)
            }
        }
    }

    fn assign(&mut self, id: NodeId, field: Field, value: AttrValue) -> TreeResult<()> {
        match (self.kind(id)?, field, value) {
            (NodeKind::Value, Field::Value, AttrValue::Scalar(scalar)) => {
                match self.parent(id) {
                    Some(prop) => {
                        let index = self.value(id)?.index;
                        let values = &mut self.property_mut(prop)?.values;
                        let len = values.len();
                        let slot = values
                            .get_mut(index)
                            .ok_or(TreeError::IndexOutOfRange { index, len })?;
                        *slot = scalar;
                    }
                    None => self.value_mut(id)?.detached = Some(scalar),
                }
                Ok(())
            }
            (NodeKind::Property, Field::Dtype, AttrValue::Dtype(dtype)) => {
                let prop = self.property_mut(id)?;
                let values = prop
                    .values
                    .iter()
                    .map(|v| dtype.convert(v))
                    .collect::<TreeResult<Vec<_>>>()?;
                prop.dtype = dtype;
                prop.values = values;
                Ok(())
            }
            (NodeKind::Property, Field::Values, AttrValue::Values(values)) => {
                self.replace_values(id, values)
            }
            (_, field, value) => self.node_mut(id)?.assign_plain(field, value),
        }
    }

    /// Swap the value list of a property, growing or shrinking its pseudo-values
    fn replace_values(&mut self, id: NodeId, values: Vec<Scalar>) -> TreeResult<()> {
        let new_len = values.len();
        let prop = self.property_mut(id)?;
        let old_values = std::mem::replace(&mut prop.values, values);
        let mut pseudo_values = std::mem::take(&mut prop.pseudo_values);

        // Dropped pseudo-values leave with the scalar they stood for and are
        // kept aside, last one on top, for the next time the list grows
        if pseudo_values.len() > new_len {
            let dropped = pseudo_values.split_off(new_len);
            for (pv, old) in dropped.iter().zip(old_values.into_iter().skip(new_len)) {
                self.parents.remove(pv);
                let node = self.value_mut(*pv)?;
                node.index = 0;
                node.detached = Some(old);
            }
            self.spare_values
                .entry(id)
                .or_default()
                .extend(dropped.into_iter().rev());
        }
        for index in pseudo_values.len()..new_len {
            let pv = match self.take_spare_value(id) {
                Some(pv) => {
                    let node = self.value_mut(pv)?;
                    node.index = index;
                    node.detached = None;
                    self.parents.insert(pv, id);
                    pv
                }
                None => self.insert_value_node(id, index),
            };
            pseudo_values.push(pv);
        }

        self.property_mut(id)?.pseudo_values = pseudo_values;
        Ok(())
    }

    /// Pop a pseudo-value dropped from `property` that is still unattached
    fn take_spare_value(&mut self, property: NodeId) -> Option<NodeId> {
        let spares = self.spare_values.get_mut(&property)?;
        while let Some(pv) = spares.pop() {
            if !self.parents.contains_key(&pv)
                && matches!(self.nodes.get(&pv), Some(Node::Value(_)))
            {
                return Some(pv);
            }
        }
        None
    }

    /// Append `child` to the matching child list of `parent`
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        let list = self.check_attach(parent, child, None)?;
        debug!(%parent, %child, ?list, "append");
        self.fire_change(parent, Action::Append, ChangePayload::Child(child), move |tree| {
            let position = tree.children(parent, list)?.len();
            tree.attach(parent, list, position, child)
        })
    }

    /// Insert `child` at `position` in the matching child list of `parent`
    pub fn insert(&mut self, parent: NodeId, position: usize, child: NodeId) -> TreeResult<()> {
        let list = self.check_attach(parent, child, Some(position))?;
        debug!(%parent, %child, position, ?list, "insert");
        self.fire_change(parent, Action::Insert, ChangePayload::Child(child), move |tree| {
            tree.attach(parent, list, position, child)
        })
    }

    /// Remove `child` from `parent`
    ///
    /// The child stays in the arena, detached, so it can be put back. A
    /// removed pseudo-value takes its scalar along and the pseudo-values
    /// after it move up one index.
    pub fn remove(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        self.kind(parent)?;
        if self.parent(child) != Some(parent) {
            return Err(TreeError::NotAChild { parent, child });
        }
        debug!(%parent, %child, "remove");
        self.fire_change(parent, Action::Remove, ChangePayload::Child(child), move |tree| {
            tree.detach(child).map(|_| ())
        })
    }

    /// Move `id` to `new_index` within its parent's list, returning its old index
    ///
    /// An index past the end moves the node to the last position.
    pub fn reorder(&mut self, id: NodeId, new_index: usize) -> TreeResult<usize> {
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let list = self.list_of(parent, id)?;
        let payload = ChangePayload::Reorder {
            list: ChildList { parent, kind: list },
            new_index,
        };
        debug!(node = %id, new_index, "reorder");
        self.fire_change(id, Action::Reorder, payload, move |tree| {
            tree.move_within(parent, list, id, new_index)
        })
    }

    fn check_attach(
        &self,
        parent: NodeId,
        child: NodeId,
        position: Option<usize>,
    ) -> TreeResult<ListKind> {
        let list = self.list_of(parent, child)?;
        if self.parent(child).is_some() {
            return Err(TreeError::AlreadyAttached(child));
        }
        if self.is_ancestor(child, parent) {
            return Err(TreeError::Cycle { parent, child });
        }
        if let Some(index) = position {
            let len = self.children(parent, list)?.len();
            if index > len {
                return Err(TreeError::IndexOutOfRange { index, len });
            }
        }
        if list == ListKind::Values {
            self.property(parent)?.dtype.convert(self.value_of(child)?)?;
        }
        Ok(list)
    }

    fn attach(
        &mut self,
        parent: NodeId,
        list: ListKind,
        position: usize,
        child: NodeId,
    ) -> TreeResult<()> {
        if list == ListKind::Values {
            let dtype = self.property(parent)?.dtype;
            let scalar = dtype.convert(self.value_of(child)?)?;
            self.value_mut(child)?.detached = None;
            for spares in self.spare_values.values_mut() {
                spares.retain(|pv| *pv != child);
            }
            let prop = self.property_mut(parent)?;
            prop.values.insert(position, scalar);
            prop.pseudo_values.insert(position, child);
        } else {
            let kind = self.kind(parent)?;
            let child_kind = self.kind(child)?;
            self.node_mut(parent)?
                .children_mut(list)
                .ok_or(TreeError::InvalidChild {
                    parent: kind,
                    child: child_kind,
                })?
                .insert(position, child);
        }
        self.parents.insert(child, parent);
        if list == ListKind::Values {
            self.renumber_values(parent)?;
        }
        Ok(())
    }

    /// Take `child` out of its parent's list, returning the index it had
    pub(crate) fn detach(&mut self, child: NodeId) -> TreeResult<usize> {
        let parent = self.parent(child).ok_or(TreeError::Detached(child))?;
        let list = self.list_of(parent, child)?;
        let index = self.position(child)?;

        if list == ListKind::Values {
            let prop = self.property_mut(parent)?;
            prop.pseudo_values.remove(index);
            let scalar = prop.values.remove(index);
            let node = self.value_mut(child)?;
            node.index = 0;
            node.detached = Some(scalar);
        } else if let Some(children) = self.node_mut(parent)?.children_mut(list) {
            children.remove(index);
        }
        self.parents.remove(&child);

        if list == ListKind::Values {
            self.renumber_values(parent)?;
        }
        Ok(index)
    }

    fn move_within(
        &mut self,
        parent: NodeId,
        list: ListKind,
        id: NodeId,
        new_index: usize,
    ) -> TreeResult<usize> {
        let old_index = self.position(id)?;

        if list == ListKind::Values {
            let prop = self.property_mut(parent)?;
            let target = new_index.min(prop.values.len() - 1);
            let scalar = prop.values.remove(old_index);
            prop.values.insert(target, scalar);
            let pv = prop.pseudo_values.remove(old_index);
            prop.pseudo_values.insert(target, pv);
            self.renumber_values(parent)?;
        } else if let Some(children) = self.node_mut(parent)?.children_mut(list) {
            let target = new_index.min(children.len() - 1);
            let child = children.remove(old_index);
            children.insert(target, child);
        }
        Ok(old_index)
    }

    /// Make every pseudo-value's index match its position again
    fn renumber_values(&mut self, prop: NodeId) -> TreeResult<()> {
        let pseudo_values = self.property(prop)?.pseudo_values.clone();
        for (index, pv) in pseudo_values.into_iter().enumerate() {
            self.value_mut(pv)?.index = index;
        }
        Ok(())
    }

    /// Announce a change around `apply`: pre-change pass, mutation, post-change pass
    fn fire_change<R>(
        &mut self,
        origin: NodeId,
        action: Action,
        val: ChangePayload,
        apply: impl FnOnce(&mut Self) -> TreeResult<R>,
    ) -> TreeResult<R> {
        let mut context = ChangeContext::new(origin, action, val);

        context.set_phase(Phase::PreChange);
        self.pass_on(&mut context, origin)?;

        let result = apply(self)?;

        context.reset();
        context.set_phase(Phase::PostChange);
        self.pass_on(&mut context, origin)?;

        Ok(result)
    }

    /// Deliver `context` to `id`, then let the node's kind decide where it goes next
    fn pass_on(&self, context: &mut ChangeContext, id: NodeId) -> TreeResult<()> {
        let kind = self.kind(id)?;
        context.push(id);
        trace!(
            origin = %context.obj(),
            action = %context.action(),
            phase = ?context.phase(),
            node = %id,
            %kind,
            "pass on change"
        );
        let result = self.deliver(context, id, kind);
        context.pop();
        result
    }

    fn deliver(&self, context: &mut ChangeContext, id: NodeId, kind: NodeKind) -> TreeResult<()> {
        if let Some(event) = self.handlers.get(&id) {
            event.fire(context, self)?;
        }
        if let Some(event) = self.kind_events.get(&kind) {
            event.fire(context, self)?;
        }
        self.propagate(context, id, kind)
    }

    fn propagate(&self, context: &mut ChangeContext, id: NodeId, kind: NodeKind) -> TreeResult<()> {
        let next = match kind {
            NodeKind::Value | NodeKind::Property => self.parent(id),
            NodeKind::Section => match self.section_propagation {
                SectionPropagation::Document => self.document_of(id),
                SectionPropagation::Ancestors => self.parent(id),
            },
            NodeKind::Document => None,
        };
        match next {
            Some(next) => self.pass_on(context, next),
            None => Ok(()),
        }
    }
}

fn scalar_from(field: Field, value: AttrValue) -> TreeResult<Scalar> {
    match value {
        AttrValue::Scalar(scalar) => Ok(scalar),
        AttrValue::Text(Some(text)) => Ok(Scalar::Text(text)),
        other => Err(invalid(field, "expected a value", &other)),
    }
}

fn invalid(field: Field, reason: &str, got: &AttrValue) -> TreeError {
    TreeError::InvalidValue {
        field,
        reason: format!("{}, got {}", reason, got),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::dtype::DType;
    use crate::tree::node::{PropertyNode, SectionNode};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    fn recorder(log: Log, tag: &'static str) -> ChangeHandler {
        Rc::new(move |ctx: &ChangeContext, _tree: &DocumentTree| {
            let phase = if ctx.pre_change() { "pre" } else { "post" };
            log.borrow_mut()
                .push(format!("{}:{}:{}", tag, phase, ctx.action()));
            Ok(())
        })
    }

    fn sample_tree() -> (DocumentTree, NodeId, NodeId) {
        let mut tree = DocumentTree::new();
        let sec = tree.add_section(SectionNode::new("recording"));
        let prop = tree
            .add_property(
                PropertyNode::new("channels", DType::Int)
                    .with_values(vec![Scalar::Int(1), Scalar::Int(2), Scalar::Int(3)]),
            )
            .unwrap();
        tree.append(tree.root(), sec).unwrap();
        tree.append(sec, prop).unwrap();
        (tree, sec, prop)
    }

    #[test]
    fn test_set_attr_fires_pre_then_post() {
        let (mut tree, _sec, prop) = sample_tree();
        let log: Log = Rc::default();
        tree.add_change_handler(prop, recorder(log.clone(), "prop"))
            .unwrap();

        tree.set_attr(prop, Field::Unit, "mV".into()).unwrap();

        assert_eq!(*log.borrow(), vec!["prop:pre:set", "prop:post:set"]);
        assert_eq!(
            tree.get_attr(prop, Field::Unit).unwrap(),
            AttrValue::Text(Some("mV".into()))
        );
    }

    #[test]
    fn test_pre_change_sees_old_state() {
        let (mut tree, _sec, prop) = sample_tree();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in_handler = seen.clone();
        let handler: ChangeHandler =
            Rc::new(move |ctx: &ChangeContext, tree: &DocumentTree| -> TreeResult<()> {
                let name = tree.get_attr(ctx.obj(), Field::Name)?;
                seen_in_handler
                    .borrow_mut()
                    .push((ctx.pre_change(), name.as_text().unwrap_or_default().to_string()));
                Ok(())
            });
        tree.add_change_handler(prop, handler).unwrap();

        tree.set_attr(prop, Field::Name, "sweeps".into()).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![(true, "channels".to_string()), (false, "sweeps".to_string())]
        );
    }

    #[test]
    fn test_invalid_set_fires_nothing() {
        let (mut tree, _sec, prop) = sample_tree();
        let log: Log = Rc::default();
        tree.add_change_handler(prop, recorder(log.clone(), "prop"))
            .unwrap();

        assert!(tree.set_attr(prop, Field::Name, "".into()).is_err());
        assert!(tree.set_attr(prop, Field::Author, "me".into()).is_err());
        assert!(tree.set_attr(prop, Field::Dtype, DType::Date.into()).is_err());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_observer_error_aborts_mutation() {
        let (mut tree, _sec, prop) = sample_tree();
        let veto: ChangeHandler = Rc::new(|ctx: &ChangeContext, _: &DocumentTree| {
            if ctx.pre_change() {
                Err(TreeError::Observer("read only".into()))
            } else {
                Ok(())
            }
        });
        tree.add_change_handler(prop, veto).unwrap();

        let err = tree.set_attr(prop, Field::Unit, "mV".into()).unwrap_err();
        assert_eq!(err, TreeError::Observer("read only".into()));
        assert_eq!(tree.get_attr(prop, Field::Unit).unwrap(), AttrValue::Text(None));
    }

    #[test]
    fn test_handler_removed_drops_event() {
        let (mut tree, sec, _prop) = sample_tree();
        let log: Log = Rc::default();
        let handler = recorder(log, "sec");
        tree.add_change_handler(sec, handler.clone()).unwrap();
        tree.add_change_handler(sec, handler.clone()).unwrap();
        assert_eq!(tree.change_handler_count(sec), 1);

        tree.remove_change_handler(sec, &handler);
        assert_eq!(tree.change_handler_count(sec), 0);
        assert!(!tree.handlers.contains_key(&sec));
    }

    #[test]
    fn test_kind_handler_runs_after_instance_handler() {
        let (mut tree, _sec, prop) = sample_tree();
        let log: Log = Rc::default();
        tree.add_change_handler(prop, recorder(log.clone(), "instance"))
            .unwrap();
        tree.add_kind_handler(NodeKind::Property, recorder(log.clone(), "kind"));

        tree.set_attr(prop, Field::Unit, "s".into()).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                "instance:pre:set",
                "kind:pre:set",
                "instance:post:set",
                "kind:post:set"
            ]
        );
    }

    #[test]
    fn test_remove_value_renumbers_pseudo_values() {
        let (mut tree, _sec, prop) = sample_tree();
        let pvs = tree.property(prop).unwrap().pseudo_values().to_vec();

        tree.remove(prop, pvs[0]).unwrap();

        let node = tree.property(prop).unwrap();
        assert_eq!(node.values(), &[Scalar::Int(2), Scalar::Int(3)]);
        assert_eq!(node.pseudo_values(), &pvs[1..]);
        assert_eq!(tree.value(pvs[1]).unwrap().index(), 0);
        assert_eq!(tree.value(pvs[2]).unwrap().index(), 1);
        assert_eq!(tree.parent(pvs[0]), None);
        assert_eq!(tree.value_of(pvs[0]).unwrap(), &Scalar::Int(1));
    }

    #[test]
    fn test_insert_value_back_restores_list() {
        let (mut tree, _sec, prop) = sample_tree();
        let pvs = tree.property(prop).unwrap().pseudo_values().to_vec();

        tree.remove(prop, pvs[1]).unwrap();
        tree.insert(prop, 1, pvs[1]).unwrap();

        let node = tree.property(prop).unwrap();
        assert_eq!(node.values(), &[Scalar::Int(1), Scalar::Int(2), Scalar::Int(3)]);
        assert_eq!(node.pseudo_values(), pvs.as_slice());
        assert_eq!(tree.value(pvs[1]).unwrap().index(), 1);
    }

    #[test]
    fn test_attach_preconditions() {
        let (mut tree, sec, prop) = sample_tree();
        let root = tree.root();

        assert_eq!(tree.append(sec, prop), Err(TreeError::AlreadyAttached(prop)));
        assert!(matches!(
            tree.append(prop, sec),
            Err(TreeError::InvalidChild { .. })
        ));

        let inner = tree.add_section(SectionNode::new("inner"));
        tree.append(sec, inner).unwrap();
        tree.remove(root, sec).unwrap();
        assert_eq!(tree.append(inner, sec), Err(TreeError::Cycle { parent: inner, child: sec }));

        let other = tree.add_section(SectionNode::new("other"));
        assert_eq!(
            tree.insert(root, 5, other),
            Err(TreeError::IndexOutOfRange { index: 5, len: 0 })
        );
        assert_eq!(
            tree.remove(root, other),
            Err(TreeError::NotAChild { parent: root, child: other })
        );
    }

    #[test]
    fn test_append_value_converts_to_dtype() {
        let (mut tree, _sec, prop) = sample_tree();
        let text_value = tree.add_value(Scalar::Text("4".into()));
        tree.append(prop, text_value).unwrap();
        assert_eq!(tree.property(prop).unwrap().values()[3], Scalar::Int(4));

        let bad = tree.add_value(Scalar::Text("four".into()));
        assert!(matches!(
            tree.append(prop, bad),
            Err(TreeError::TypeMismatch { .. })
        ));
        assert_eq!(tree.property(prop).unwrap().values().len(), 4);
    }

    #[test]
    fn test_reorder_returns_old_index() {
        let (mut tree, sec, _prop) = sample_tree();
        let root = tree.root();
        let other = tree.add_section(SectionNode::new("other"));
        tree.append(root, other).unwrap();

        assert_eq!(tree.reorder(other, 0).unwrap(), 1);
        assert_eq!(tree.document(root).unwrap().sections(), &[other, sec]);

        // Past the end clamps to the last slot
        assert_eq!(tree.reorder(other, 10).unwrap(), 0);
        assert_eq!(tree.document(root).unwrap().sections(), &[sec, other]);
    }

    #[test]
    fn test_reorder_values_moves_scalars() {
        let (mut tree, _sec, prop) = sample_tree();
        let pvs = tree.property(prop).unwrap().pseudo_values().to_vec();

        assert_eq!(tree.reorder(pvs[2], 0).unwrap(), 2);
        let node = tree.property(prop).unwrap();
        assert_eq!(node.values(), &[Scalar::Int(3), Scalar::Int(1), Scalar::Int(2)]);
        assert_eq!(tree.value(pvs[2]).unwrap().index(), 0);
        assert_eq!(tree.value_of(pvs[2]).unwrap(), &Scalar::Int(3));
    }

    #[test]
    fn test_change_dtype_converts_values() {
        let (mut tree, _sec, prop) = sample_tree();
        tree.set_attr(prop, Field::Dtype, "float".into()).unwrap();
        let node = tree.property(prop).unwrap();
        assert_eq!(node.dtype(), DType::Float);
        assert_eq!(node.values()[0], Scalar::Float(1.0));
    }

    #[test]
    fn test_set_values_resyncs_pseudo_values() {
        let (mut tree, _sec, prop) = sample_tree();
        let pvs = tree.property(prop).unwrap().pseudo_values().to_vec();

        tree.set_attr(prop, Field::Values, vec![Scalar::Int(7)].into())
            .unwrap();
        let node = tree.property(prop).unwrap();
        assert_eq!(node.pseudo_values(), &pvs[..1]);
        assert_eq!(tree.parent(pvs[2]), None);
        assert_eq!(tree.value_of(pvs[2]).unwrap(), &Scalar::Int(3));

        tree.set_attr(
            prop,
            Field::Values,
            vec![Scalar::Int(7), Scalar::Int(8), Scalar::Int(9), Scalar::Int(10)].into(),
        )
        .unwrap();
        let node = tree.property(prop).unwrap();
        assert_eq!(node.pseudo_values().len(), 4);
        for (i, pv) in node.pseudo_values().iter().enumerate() {
            assert_eq!(tree.value(*pv).unwrap().index(), i);
            assert_eq!(tree.value_of(*pv).unwrap(), &node.values()[i]);
        }
    }

    #[test]
    fn test_regrown_values_reuse_dropped_pseudo_values() {
        let (mut tree, _sec, prop) = sample_tree();
        let pvs = tree.property(prop).unwrap().pseudo_values().to_vec();
        let nodes = tree.node_count();

        for _ in 0..5 {
            tree.set_attr(prop, Field::Values, vec![Scalar::Int(7)].into())
                .unwrap();
            tree.set_attr(
                prop,
                Field::Values,
                vec![Scalar::Int(1), Scalar::Int(2), Scalar::Int(3)].into(),
            )
            .unwrap();
            assert_eq!(tree.property(prop).unwrap().pseudo_values(), pvs.as_slice());
            assert_eq!(tree.node_count(), nodes);
        }
        for (i, pv) in pvs.iter().enumerate() {
            assert_eq!(tree.parent(*pv), Some(prop));
            assert_eq!(tree.value(*pv).unwrap().index(), i);
        }
    }

    #[test]
    fn test_reattached_spare_value_is_not_reused() {
        let (mut tree, sec, prop) = sample_tree();
        let pvs = tree.property(prop).unwrap().pseudo_values().to_vec();
        let other = tree
            .add_property(PropertyNode::new("gain", DType::Int))
            .unwrap();
        tree.append(sec, other).unwrap();

        tree.set_attr(prop, Field::Values, vec![Scalar::Int(7), Scalar::Int(8)].into())
            .unwrap();
        tree.append(other, pvs[2]).unwrap();
        tree.set_attr(
            prop,
            Field::Values,
            vec![Scalar::Int(7), Scalar::Int(8), Scalar::Int(9)].into(),
        )
        .unwrap();

        let regrown = tree.property(prop).unwrap().pseudo_values()[2];
        assert_ne!(regrown, pvs[2]);
        assert_eq!(tree.parent(regrown), Some(prop));
        assert_eq!(tree.parent(pvs[2]), Some(other));
    }

    #[test]
    fn test_nested_section_and_property_attach() {
        let (mut tree, sec, prop) = sample_tree();
        let inner = tree.add_section(SectionNode::new("inner"));
        let first = tree.add_section(SectionNode::new("first"));
        let extra = tree
            .add_property(PropertyNode::new("gain", DType::Float))
            .unwrap();

        tree.append(sec, inner).unwrap();
        tree.insert(sec, 0, first).unwrap();
        tree.insert(sec, 0, extra).unwrap();

        assert_eq!(tree.children(sec, ListKind::Sections).unwrap(), &[first, inner]);
        assert_eq!(tree.children(sec, ListKind::Properties).unwrap(), &[extra, prop]);
        assert_eq!(tree.parent(inner), Some(sec));
        assert_eq!(tree.parent(extra), Some(sec));
    }
}
