// Pseudo-values: addressable stand-ins for the scalars of a property
//
// A property keeps its values as a plain list of scalars. Editing one entry
// needs something with an identity, so every entry gets a Value node whose
// index points back into the list. The notifying primitives keep the two
// lists in step; this file holds the read side.

use crate::tree::DocumentTree;
use crate::tree::dtype::Scalar;
use crate::tree::error::{TreeError, TreeResult};
use crate::tree::node::NodeId;

impl DocumentTree {
    /// The scalar a pseudo-value stands for
    pub fn value_of(&self, id: NodeId) -> TreeResult<&Scalar> {
        let node = self.value(id)?;
        if let Some(scalar) = &node.detached {
            return Ok(scalar);
        }
        let prop = self.parent(id).ok_or(TreeError::Detached(id))?;
        let values = &self.property(prop)?.values;
        values.get(node.index).ok_or(TreeError::IndexOutOfRange {
            index: node.index,
            len: values.len(),
        })
    }

    /// A detached pseudo-value holding the default of the property's dtype,
    /// ready to be appended to `property`
    pub fn new_pseudo_value(&mut self, property: NodeId) -> TreeResult<NodeId> {
        let default = self.property(property)?.dtype.default_value();
        Ok(self.add_value(default))
    }

    /// Whether the value fits on a single line of at most `max_length` chars
    pub fn can_display(&self, id: NodeId, max_length: Option<usize>) -> TreeResult<bool> {
        Ok(fits_on_line(&self.value_of(id)?.to_string(), max_length))
    }

    /// Single-line rendering of a value
    ///
    /// Multi-line or overlong text is cut to its first line and marked with
    /// `[...]`; if even that does not fit, only the size is shown.
    pub fn display_text(&self, id: NodeId, max_length: Option<usize>) -> TreeResult<String> {
        let text = self.value_of(id)?.to_string();
        if fits_on_line(&text, max_length) {
            return Ok(text);
        }

        let mut first_line: String = text.split('\n').next().unwrap_or_default().to_string();
        if let Some(max) = max_length {
            first_line = first_line.chars().take(max).collect();
        }
        if fits_on_line(&first_line, max_length) {
            return Ok(format!("{} [...]", first_line));
        }
        Ok(format!("({} bytes)", text.len()))
    }
}

fn fits_on_line(text: &str, max_length: Option<usize>) -> bool {
    if max_length.is_some_and(|max| text.chars().count() > max) {
        return false;
    }
    !text.contains('\n') && !text.contains('\t')
}
