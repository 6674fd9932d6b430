// In-memory odML document tree
//
// The tree is an arena of nodes keyed by `NodeId`. Parent links are kept in
// a separate child -> parent map, which keeps reparenting (move, delete,
// undo of either) free of aliasing concerns.
//
// Reading goes through the accessors in this file. Every mutation goes
// through the notifying primitives in `notify`, which announce the change
// to observers before and after it is applied.

pub mod dtype;
pub mod error;
pub mod event;
pub mod node;
pub mod notify;
pub mod value;

use crate::config::{EditorConfig, SectionPropagation};
use dtype::Scalar;
use error::{TreeError, TreeResult};
use event::Event;
use node::{DocumentNode, ListKind, Node, NodeId, NodeKind, PropertyNode, SectionNode, ValueNode};
use serde_json::json;
use std::collections::HashMap;

pub use dtype::DType;
pub use event::{Action, ChangeContext, ChangeHandler, ChangePayload, Phase};
pub use node::{AttrValue, ChildList, Field};

/// An odML document together with its change observers
pub struct DocumentTree {
    root: NodeId,
    nodes: HashMap<NodeId, Node>,
    parents: HashMap<NodeId, NodeId>,
    /// Per-node observers, created on first registration
    handlers: HashMap<NodeId, Event>,
    /// Observers of every node of one kind
    kind_events: HashMap<NodeKind, Event>,
    /// Pseudo-values dropped by shrinking a value list, per property
    spare_values: HashMap<NodeId, Vec<NodeId>>,
    section_propagation: SectionPropagation,
}

impl DocumentTree {
    /// Create a tree holding an empty document
    pub fn new() -> Self {
        Self::with_document(DocumentNode::new())
    }

    pub fn with_document(document: DocumentNode) -> Self {
        let root = NodeId::new();
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node::Document(DocumentNode {
                sections: Vec::new(),
                ..document
            }),
        );

        let kind_events = [
            (NodeKind::Document, "doc"),
            (NodeKind::Section, "sec"),
            (NodeKind::Property, "prop"),
            (NodeKind::Value, "value"),
        ]
        .into_iter()
        .map(|(kind, name)| (kind, Event::new(name)))
        .collect();

        Self {
            root,
            nodes,
            parents: HashMap::new(),
            handlers: HashMap::new(),
            kind_events,
            spare_values: HashMap::new(),
            section_propagation: SectionPropagation::default(),
        }
    }

    pub fn with_config(config: &EditorConfig) -> Self {
        let mut tree = Self::new();
        tree.section_propagation = config.section_propagation;
        tree
    }

    pub fn set_section_propagation(&mut self, propagation: SectionPropagation) {
        self.section_propagation = propagation;
    }

    pub fn section_propagation(&self) -> SectionPropagation {
        self.section_propagation
    }

    /// The document node
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of nodes held, attached or not
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> TreeResult<&Node> {
        self.nodes.get(&id).ok_or(TreeError::NodeNotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> TreeResult<&mut Node> {
        self.nodes.get_mut(&id).ok_or(TreeError::NodeNotFound(id))
    }

    pub fn kind(&self, id: NodeId) -> TreeResult<NodeKind> {
        Ok(self.node(id)?.kind())
    }

    pub fn document(&self, id: NodeId) -> TreeResult<&DocumentNode> {
        match self.node(id)? {
            Node::Document(doc) => Ok(doc),
            other => Err(wrong_kind(id, NodeKind::Document, other)),
        }
    }

    pub fn section(&self, id: NodeId) -> TreeResult<&SectionNode> {
        match self.node(id)? {
            Node::Section(sec) => Ok(sec),
            other => Err(wrong_kind(id, NodeKind::Section, other)),
        }
    }

    pub fn property(&self, id: NodeId) -> TreeResult<&PropertyNode> {
        match self.node(id)? {
            Node::Property(prop) => Ok(prop),
            other => Err(wrong_kind(id, NodeKind::Property, other)),
        }
    }

    pub fn value(&self, id: NodeId) -> TreeResult<&ValueNode> {
        match self.node(id)? {
            Node::Value(val) => Ok(val),
            other => Err(wrong_kind(id, NodeKind::Value, other)),
        }
    }

    pub(crate) fn property_mut(&mut self, id: NodeId) -> TreeResult<&mut PropertyNode> {
        match self.node_mut(id)? {
            Node::Property(prop) => Ok(prop),
            other => Err(wrong_kind(id, NodeKind::Property, other)),
        }
    }

    pub(crate) fn value_mut(&mut self, id: NodeId) -> TreeResult<&mut ValueNode> {
        match self.node_mut(id)? {
            Node::Value(val) => Ok(val),
            other => Err(wrong_kind(id, NodeKind::Value, other)),
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(&id).copied()
    }

    /// The document a node belongs to, if it is attached to one
    pub fn document_of(&self, id: NodeId) -> Option<NodeId> {
        let mut top = id;
        while let Some(parent) = self.parent(top) {
            top = parent;
        }
        match self.nodes.get(&top) {
            Some(Node::Document(_)) if top != id => Some(top),
            _ => None,
        }
    }

    /// Whether `ancestor` lies on the parent chain of `id` (or is `id`)
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(node) = cur {
            if node == ancestor {
                return true;
            }
            cur = self.parent(node);
        }
        false
    }

    pub fn children(&self, id: NodeId, list: ListKind) -> TreeResult<&[NodeId]> {
        let node = self.node(id)?;
        node.children(list)
            .map(Vec::as_slice)
            .ok_or(TreeError::InvalidChild {
                parent: node.kind(),
                child: list_member_kind(list),
            })
    }

    /// The list of `parent` that `child` belongs to (or would belong to)
    pub fn list_of(&self, parent: NodeId, child: NodeId) -> TreeResult<ListKind> {
        let parent_kind = self.kind(parent)?;
        let child_kind = self.kind(child)?;
        parent_kind
            .list_for(child_kind)
            .ok_or(TreeError::InvalidChild {
                parent: parent_kind,
                child: child_kind,
            })
    }

    /// Index of a node within its parent's list
    pub fn position(&self, id: NodeId) -> TreeResult<usize> {
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let list = self.list_of(parent, id)?;
        self.children(parent, list)?
            .iter()
            .position(|child| *child == id)
            .ok_or(TreeError::NotAChild { parent, child: id })
    }

    /// Number of children `parent` holds in the list `child` would go into
    pub fn child_count_for(&self, parent: NodeId, child: NodeId) -> TreeResult<usize> {
        let list = self.list_of(parent, child)?;
        Ok(self.children(parent, list)?.len())
    }

    /// Add a detached section; child lists of `section` are ignored
    pub fn add_section(&mut self, section: SectionNode) -> NodeId {
        let id = NodeId::new();
        self.nodes.insert(
            id,
            Node::Section(SectionNode {
                sections: Vec::new(),
                properties: Vec::new(),
                ..section
            }),
        );
        id
    }

    /// Add a detached property with one pseudo-value per entry of its values
    ///
    /// Values are converted to the property's dtype.
    pub fn add_property(&mut self, property: PropertyNode) -> TreeResult<NodeId> {
        let values = property
            .values
            .iter()
            .map(|v| property.dtype.convert(v))
            .collect::<TreeResult<Vec<_>>>()?;

        let id = NodeId::new();
        let pseudo_values = (0..values.len())
            .map(|index| self.insert_value_node(id, index))
            .collect();
        self.nodes.insert(
            id,
            Node::Property(PropertyNode {
                values,
                pseudo_values,
                ..property
            }),
        );
        Ok(id)
    }

    /// Add a detached pseudo-value carrying `scalar`
    pub fn add_value(&mut self, scalar: Scalar) -> NodeId {
        let id = NodeId::new();
        self.nodes.insert(
            id,
            Node::Value(ValueNode {
                index: 0,
                detached: Some(scalar),
            }),
        );
        id
    }

    /// Create the pseudo-value node for `property.values[index]`
    pub(crate) fn insert_value_node(&mut self, property: NodeId, index: usize) -> NodeId {
        let id = NodeId::new();
        self.nodes.insert(
            id,
            Node::Value(ValueNode {
                index,
                detached: None,
            }),
        );
        self.parents.insert(id, property);
        id
    }

    /// Deep copy of a subtree with fresh ids; the copy has no parent
    pub fn clone_subtree(&mut self, id: NodeId) -> TreeResult<NodeId> {
        self.clone_node(id, None)
    }

    fn clone_node(&mut self, id: NodeId, parent: Option<NodeId>) -> TreeResult<NodeId> {
        let new_id = NodeId::new();
        let cloned = match self.node(id)?.clone() {
            Node::Document(doc) => {
                let sections = self.clone_children(&doc.sections, new_id)?;
                Node::Document(DocumentNode { sections, ..doc })
            }
            Node::Section(sec) => {
                let sections = self.clone_children(&sec.sections, new_id)?;
                let properties = self.clone_children(&sec.properties, new_id)?;
                Node::Section(SectionNode {
                    sections,
                    properties,
                    ..sec
                })
            }
            Node::Property(prop) => {
                let pseudo_values = (0..prop.values.len())
                    .map(|index| self.insert_value_node(new_id, index))
                    .collect();
                Node::Property(PropertyNode {
                    pseudo_values,
                    ..prop
                })
            }
            Node::Value(_) => Node::Value(ValueNode {
                index: 0,
                detached: Some(self.value_of(id)?.clone()),
            }),
        };
        self.nodes.insert(new_id, cloned);
        if let Some(parent) = parent {
            self.parents.insert(new_id, parent);
        }
        Ok(new_id)
    }

    fn clone_children(&mut self, children: &[NodeId], parent: NodeId) -> TreeResult<Vec<NodeId>> {
        children
            .iter()
            .map(|child| self.clone_node(*child, Some(parent)))
            .collect()
    }

    /// Render a subtree as JSON, without node ids
    ///
    /// Two snapshots compare equal when the subtrees hold the same data
    /// in the same order, which is what undo is expected to restore.
    pub fn snapshot(&self, id: NodeId) -> TreeResult<serde_json::Value> {
        let snapshot = match self.node(id)? {
            Node::Document(doc) => json!({
                "kind": "document",
                "author": doc.author,
                "version": doc.version,
                "date": doc.date,
                "repository": doc.repository,
                "sections": self.snapshot_all(&doc.sections)?,
            }),
            Node::Section(sec) => json!({
                "kind": "section",
                "name": sec.name,
                "type": sec.section_type,
                "definition": sec.definition,
                "reference": sec.reference,
                "repository": sec.repository,
                "link": sec.link,
                "include": sec.include,
                "sections": self.snapshot_all(&sec.sections)?,
                "properties": self.snapshot_all(&sec.properties)?,
            }),
            Node::Property(prop) => json!({
                "kind": "property",
                "name": prop.name,
                "definition": prop.definition,
                "unit": prop.unit,
                "uncertainty": prop.uncertainty,
                "reference": prop.reference,
                "dependency": prop.dependency,
                "dependency_value": prop.dependency_value,
                "value_origin": prop.value_origin,
                "dtype": prop.dtype.name(),
                "values": prop.values.iter().map(|v| v.to_string()).collect::<Vec<_>>(),
                "pseudo_values": self.snapshot_all(&prop.pseudo_values)?,
            }),
            Node::Value(_) => json!({
                "kind": "value",
                "value": self.value_of(id)?.to_string(),
            }),
        };
        Ok(snapshot)
    }

    fn snapshot_all(&self, ids: &[NodeId]) -> TreeResult<Vec<serde_json::Value>> {
        ids.iter().map(|id| self.snapshot(*id)).collect()
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DocumentTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentTree")
            .field("root", &self.root)
            .field("nodes", &self.nodes.len())
            .field("observed_nodes", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

fn wrong_kind(id: NodeId, expected: NodeKind, found: &Node) -> TreeError {
    TreeError::WrongKind {
        id,
        expected,
        found: found.kind(),
    }
}

fn list_member_kind(list: ListKind) -> NodeKind {
    match list {
        ListKind::Sections => NodeKind::Section,
        ListKind::Properties => NodeKind::Property,
        ListKind::Values => NodeKind::Value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_tree_has_empty_document() {
        let tree = DocumentTree::new();
        assert_eq!(tree.kind(tree.root()).unwrap(), NodeKind::Document);
        assert!(tree.document(tree.root()).unwrap().sections().is_empty());
        assert_eq!(tree.parent(tree.root()), None);
        assert_eq!(tree.document_of(tree.root()), None);
    }

    #[test]
    fn test_add_property_creates_pseudo_values() {
        let mut tree = DocumentTree::new();
        let prop = tree
            .add_property(
                PropertyNode::new("count", DType::Int)
                    .with_values(vec![Scalar::Int(1), Scalar::Text("2".into())]),
            )
            .unwrap();

        let node = tree.property(prop).unwrap();
        assert_eq!(node.values(), &[Scalar::Int(1), Scalar::Int(2)]);
        assert_eq!(node.pseudo_values().len(), 2);
        for (i, pv) in node.pseudo_values().iter().enumerate() {
            assert_eq!(tree.value(*pv).unwrap().index(), i);
            assert_eq!(tree.parent(*pv), Some(prop));
        }
    }

    #[test]
    fn test_add_property_rejects_bad_values() {
        let mut tree = DocumentTree::new();
        let result = tree.add_property(
            PropertyNode::new("count", DType::Int).with_values(vec!["many".into()]),
        );
        assert!(matches!(result, Err(TreeError::TypeMismatch { .. })));
    }

    #[test]
    fn test_typed_accessor_reports_wrong_kind() {
        let mut tree = DocumentTree::new();
        let sec = tree.add_section(SectionNode::new("subject"));
        let err = tree.property(sec).unwrap_err();
        assert_eq!(
            err,
            TreeError::WrongKind {
                id: sec,
                expected: NodeKind::Property,
                found: NodeKind::Section
            }
        );
    }

    #[test]
    fn test_clone_subtree_is_detached_deep_copy() {
        let mut tree = DocumentTree::new();
        let sec = tree.add_section(SectionNode::new("subject").with_type("subject"));
        let prop = tree
            .add_property(PropertyNode::new("age", DType::Int).with_values(vec![Scalar::Int(4)]))
            .unwrap();
        tree.append(tree.root(), sec).unwrap();
        tree.append(sec, prop).unwrap();

        let copy = tree.clone_subtree(sec).unwrap();
        assert_ne!(copy, sec);
        assert_eq!(tree.parent(copy), None);
        assert_eq!(tree.snapshot(copy).unwrap(), tree.snapshot(sec).unwrap());

        let copied_prop = tree.section(copy).unwrap().properties()[0];
        assert_ne!(copied_prop, prop);
        assert_eq!(tree.parent(copied_prop), Some(copy));
    }

    #[test]
    fn test_position_and_document_of() {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let a = tree.add_section(SectionNode::new("a"));
        let b = tree.add_section(SectionNode::new("b"));
        let nested = tree.add_section(SectionNode::new("nested"));
        tree.append(root, a).unwrap();
        tree.append(root, b).unwrap();
        tree.append(b, nested).unwrap();

        assert_eq!(tree.position(a).unwrap(), 0);
        assert_eq!(tree.position(b).unwrap(), 1);
        assert_eq!(tree.document_of(nested), Some(root));
        assert!(tree.is_ancestor(b, nested));
        assert!(!tree.is_ancestor(a, nested));
        assert_eq!(tree.position(root), Err(TreeError::Detached(root)));
    }
}
