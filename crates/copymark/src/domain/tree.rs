//! Abstract content tree consumed by the copy pipeline.

use std::fmt::Debug;
use std::hash::Hash;

use crate::domain::errors::TreeError;
use crate::domain::model::Attribute;

/// Borrowed view of a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef<'a> {
    Element {
        tag: &'a str,
        attributes: &'a [Attribute],
    },
    Text(&'a str),
}

/// Read-only access to a rendered content tree.
///
/// Implementations guarantee an acyclic structure; traversals never check for cycles.
pub trait ContentTree {
    type NodeId: Copy + Eq + Hash + Debug;

    /// The attached root element.
    fn root(&self) -> Result<Self::NodeId, TreeError>;

    fn node(&self, id: Self::NodeId) -> NodeRef<'_>;

    /// Child nodes in document order.
    fn children(&self, id: Self::NodeId) -> &[Self::NodeId];

    /// Computed visibility of an element node.
    fn is_visible(&self, id: Self::NodeId) -> bool;

    fn attribute(&self, id: Self::NodeId, name: &str) -> Option<&str> {
        match self.node(id) {
            NodeRef::Element { attributes, .. } => attributes
                .iter()
                .find(|attr| attr.name == name)
                .map(|attr| attr.value.as_str()),
            NodeRef::Text(_) => None,
        }
    }

    fn has_attribute(&self, id: Self::NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    fn tag_name(&self, id: Self::NodeId) -> Option<&str> {
        match self.node(id) {
            NodeRef::Element { tag, .. } => Some(tag),
            NodeRef::Text(_) => None,
        }
    }

    fn is_element(&self, id: Self::NodeId) -> bool {
        matches!(self.node(id), NodeRef::Element { .. })
    }
}
