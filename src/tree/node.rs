// Node entities of the odML document tree
//
// Nodes never point at each other. Children are held as ordered lists of
// `NodeId` handles and the child -> parent relation lives in the owning
// `DocumentTree`, so moving a node between parents is a matter of
// editing two lists and one map entry.

use crate::tree::dtype::{DType, Scalar};
use crate::tree::error::{TreeError, TreeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable handle of a node inside a `DocumentTree`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Document,
    Section,
    Property,
    Value,
}

impl NodeKind {
    /// The child list of a parent of this kind that holds `child` nodes
    pub fn list_for(self, child: NodeKind) -> Option<ListKind> {
        match (self, child) {
            (NodeKind::Document, NodeKind::Section) => Some(ListKind::Sections),
            (NodeKind::Section, NodeKind::Section) => Some(ListKind::Sections),
            (NodeKind::Section, NodeKind::Property) => Some(ListKind::Properties),
            (NodeKind::Property, NodeKind::Value) => Some(ListKind::Values),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Document => "document",
            NodeKind::Section => "section",
            NodeKind::Property => "property",
            NodeKind::Value => "value",
        };
        f.write_str(name)
    }
}

/// Which ordered child list of a node is meant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListKind {
    Sections,
    Properties,
    Values,
}

/// A child list addressed by its owner, used as the payload of reorder changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChildList {
    pub parent: NodeId,
    pub kind: ListKind,
}

/// Mutable attributes of tree nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Name,
    Type,
    Definition,
    Reference,
    Repository,
    Link,
    Include,
    Unit,
    Uncertainty,
    Dependency,
    DependencyValue,
    ValueOrigin,
    Dtype,
    Values,
    Author,
    Version,
    Date,
    /// The scalar a pseudo-value stands for
    Value,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Type => "type",
            Field::Definition => "definition",
            Field::Reference => "reference",
            Field::Repository => "repository",
            Field::Link => "link",
            Field::Include => "include",
            Field::Unit => "unit",
            Field::Uncertainty => "uncertainty",
            Field::Dependency => "dependency",
            Field::DependencyValue => "dependency_value",
            Field::ValueOrigin => "value_origin",
            Field::Dtype => "dtype",
            Field::Values => "values",
            Field::Author => "author",
            Field::Version => "version",
            Field::Date => "date",
            Field::Value => "value",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value carried by a `Field`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Text(Option<String>),
    Dtype(DType),
    Scalar(Scalar),
    Values(Vec<Scalar>),
}

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(text) => text.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Text(Some(text)) => write!(f, "{:?}", text),
            AttrValue::Text(None) => f.write_str("None"),
            AttrValue::Dtype(dtype) => write!(f, "{}", dtype),
            AttrValue::Scalar(scalar) => write!(f, "{}", scalar),
            AttrValue::Values(values) => {
                let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

impl From<&str> for AttrValue {
    fn from(text: &str) -> Self {
        AttrValue::Text(Some(text.to_string()))
    }
}

impl From<String> for AttrValue {
    fn from(text: String) -> Self {
        AttrValue::Text(Some(text))
    }
}

impl From<Option<String>> for AttrValue {
    fn from(text: Option<String>) -> Self {
        AttrValue::Text(text)
    }
}

impl From<DType> for AttrValue {
    fn from(dtype: DType) -> Self {
        AttrValue::Dtype(dtype)
    }
}

impl From<Scalar> for AttrValue {
    fn from(scalar: Scalar) -> Self {
        AttrValue::Scalar(scalar)
    }
}

impl From<Vec<Scalar>> for AttrValue {
    fn from(values: Vec<Scalar>) -> Self {
        AttrValue::Values(values)
    }
}

/// Root of an odML document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    pub author: Option<String>,
    pub version: Option<String>,
    pub date: Option<String>,
    pub repository: Option<String>,
    pub(crate) sections: Vec<NodeId>,
}

impl DocumentNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn sections(&self) -> &[NodeId] {
        &self.sections
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionNode {
    pub name: String,
    pub section_type: Option<String>,
    pub definition: Option<String>,
    pub reference: Option<String>,
    pub repository: Option<String>,
    pub link: Option<String>,
    pub include: Option<String>,
    pub(crate) sections: Vec<NodeId>,
    pub(crate) properties: Vec<NodeId>,
}

impl SectionNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, section_type: impl Into<String>) -> Self {
        self.section_type = Some(section_type.into());
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    pub fn sections(&self) -> &[NodeId] {
        &self.sections
    }

    pub fn properties(&self) -> &[NodeId] {
        &self.properties
    }
}

/// A named, typed list of values attached to a section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyNode {
    pub name: String,
    pub definition: Option<String>,
    pub unit: Option<String>,
    pub uncertainty: Option<String>,
    pub reference: Option<String>,
    pub dependency: Option<String>,
    pub dependency_value: Option<String>,
    pub value_origin: Option<String>,
    pub(crate) dtype: DType,
    pub(crate) values: Vec<Scalar>,
    pub(crate) pseudo_values: Vec<NodeId>,
}

impl PropertyNode {
    pub fn new(name: impl Into<String>, dtype: DType) -> Self {
        Self {
            name: name.into(),
            dtype,
            ..Self::default()
        }
    }

    pub fn with_values(mut self, values: Vec<Scalar>) -> Self {
        self.values = values;
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    /// One addressable value node per entry of `values`, in the same order
    pub fn pseudo_values(&self) -> &[NodeId] {
        &self.pseudo_values
    }
}

/// Addressable stand-in for one entry of a property's value list
///
/// While attached, `index` points into the owning property's `values`.
/// A detached pseudo-value carries its scalar with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueNode {
    pub(crate) index: usize,
    pub(crate) detached: Option<Scalar>,
}

impl ValueNode {
    pub fn index(&self) -> usize {
        self.index
    }
}

// Field -> optional text attribute table, shared by the `&` and `&mut` accessors
macro_rules! text_fields {
    ($node:expr, $field:expr, $($borrow:tt)+) => {
        match ($node, $field) {
            (Node::Document(doc), Field::Author) => Some($($borrow)+ doc.author),
            (Node::Document(doc), Field::Version) => Some($($borrow)+ doc.version),
            (Node::Document(doc), Field::Date) => Some($($borrow)+ doc.date),
            (Node::Document(doc), Field::Repository) => Some($($borrow)+ doc.repository),
            (Node::Section(sec), Field::Type) => Some($($borrow)+ sec.section_type),
            (Node::Section(sec), Field::Definition) => Some($($borrow)+ sec.definition),
            (Node::Section(sec), Field::Reference) => Some($($borrow)+ sec.reference),
            (Node::Section(sec), Field::Repository) => Some($($borrow)+ sec.repository),
            (Node::Section(sec), Field::Link) => Some($($borrow)+ sec.link),
            (Node::Section(sec), Field::Include) => Some($($borrow)+ sec.include),
            (Node::Property(prop), Field::Definition) => Some($($borrow)+ prop.definition),
            (Node::Property(prop), Field::Unit) => Some($($borrow)+ prop.unit),
            (Node::Property(prop), Field::Uncertainty) => Some($($borrow)+ prop.uncertainty),
            (Node::Property(prop), Field::Reference) => Some($($borrow)+ prop.reference),
            (Node::Property(prop), Field::Dependency) => Some($($borrow)+ prop.dependency),
            (Node::Property(prop), Field::DependencyValue) => {
                Some($($borrow)+ prop.dependency_value)
            }
            (Node::Property(prop), Field::ValueOrigin) => Some($($borrow)+ prop.value_origin),
            _ => None,
        }
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Document(DocumentNode),
    Section(SectionNode),
    Property(PropertyNode),
    Value(ValueNode),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Document(_) => NodeKind::Document,
            Node::Section(_) => NodeKind::Section,
            Node::Property(_) => NodeKind::Property,
            Node::Value(_) => NodeKind::Value,
        }
    }

    pub fn children(&self, list: ListKind) -> Option<&Vec<NodeId>> {
        match (self, list) {
            (Node::Document(doc), ListKind::Sections) => Some(&doc.sections),
            (Node::Section(sec), ListKind::Sections) => Some(&sec.sections),
            (Node::Section(sec), ListKind::Properties) => Some(&sec.properties),
            (Node::Property(prop), ListKind::Values) => Some(&prop.pseudo_values),
            _ => None,
        }
    }

    pub(crate) fn children_mut(&mut self, list: ListKind) -> Option<&mut Vec<NodeId>> {
        match (self, list) {
            (Node::Document(doc), ListKind::Sections) => Some(&mut doc.sections),
            (Node::Section(sec), ListKind::Sections) => Some(&mut sec.sections),
            (Node::Section(sec), ListKind::Properties) => Some(&mut sec.properties),
            (Node::Property(prop), ListKind::Values) => Some(&mut prop.pseudo_values),
            _ => None,
        }
    }

    /// Optional text attributes, addressed by field
    fn text_slot(&mut self, field: Field) -> Option<&mut Option<String>> {
        text_fields!(self, field, &mut)
    }

    fn text_attr(&self, field: Field) -> Option<&Option<String>> {
        text_fields!(self, field, &)
    }

    /// Read a plain (name or optional text) attribute
    pub(crate) fn plain_attr(&self, field: Field) -> TreeResult<AttrValue> {
        let unsupported = TreeError::UnsupportedField {
            kind: self.kind(),
            field,
        };
        if field == Field::Name {
            return match self {
                Node::Section(sec) => Ok(AttrValue::Text(Some(sec.name.clone()))),
                Node::Property(prop) => Ok(AttrValue::Text(Some(prop.name.clone()))),
                _ => Err(unsupported),
            };
        }
        self.text_attr(field)
            .map(|text| AttrValue::Text(text.clone()))
            .ok_or(unsupported)
    }

    /// Check that `value` may be assigned to the plain attribute `field`
    pub(crate) fn check_plain(&self, field: Field, value: &AttrValue) -> TreeResult<()> {
        self.plain_attr(field)?;
        match value {
            AttrValue::Text(text) => {
                let blank = text.as_deref().is_none_or(|t| t.trim().is_empty());
                if field == Field::Name && blank {
                    return Err(TreeError::InvalidValue {
                        field,
                        reason: "name cannot be empty".into(),
                    });
                }
                Ok(())
            }
            other => Err(TreeError::InvalidValue {
                field,
                reason: format!("expected text, got {}", other),
            }),
        }
    }

    /// Assign a plain attribute; the value is checked before anything changes
    pub(crate) fn assign_plain(&mut self, field: Field, value: AttrValue) -> TreeResult<()> {
        self.check_plain(field, &value)?;
        let AttrValue::Text(text) = value else {
            return Ok(());
        };

        match (self, field) {
            (Node::Section(sec), Field::Name) => sec.name = text.unwrap_or_default(),
            (Node::Property(prop), Field::Name) => prop.name = text.unwrap_or_default(),
            (node, field) => {
                if let Some(slot) = node.text_slot(field) {
                    *slot = text;
                }
            }
        }
        Ok(())
    }
}
