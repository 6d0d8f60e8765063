//! Exclusion-aware text extraction.

use crate::domain::model::NO_COPY_ATTRIBUTE;
use crate::domain::tree::{ContentTree, NodeRef};

/// Extract the text of `element`, skipping every subtree marked `no-copy`.
///
/// Each element's contribution is trimmed before it is appended to its parent, so
/// `<p>Hello <b> world </b>!</p>` reads `Hello world!`. Elements without element children
/// contribute their trimmed text content.
pub fn extract_text<T: ContentTree>(tree: &T, element: T::NodeId) -> String {
    if is_excluded(tree, element) {
        return String::new();
    }
    if !has_element_children(tree, element) {
        return leaf_text(tree, element).trim().to_owned();
    }

    let mut stack = vec![Frame::new(element)];
    while let Some(frame) = stack.last_mut() {
        let children = tree.children(frame.node);
        let Some(&child) = children.get(frame.next) else {
            let finished = stack.pop().map(|frame| frame.text).unwrap_or_default();
            let finished = finished.trim();
            match stack.last_mut() {
                Some(parent) => parent.text.push_str(finished),
                None => return finished.to_owned(),
            }
            continue;
        };
        frame.next += 1;

        match tree.node(child) {
            NodeRef::Text(text) => frame.text.push_str(text),
            NodeRef::Element { .. } if is_excluded(tree, child) => {}
            NodeRef::Element { .. } if !has_element_children(tree, child) => {
                frame.text.push_str(leaf_text(tree, child).trim());
            }
            NodeRef::Element { .. } => stack.push(Frame::new(child)),
        }
    }

    String::new()
}

pub(crate) fn is_excluded<T: ContentTree>(tree: &T, node: T::NodeId) -> bool {
    tree.has_attribute(node, NO_COPY_ATTRIBUTE)
}

struct Frame<N> {
    node: N,
    next: usize,
    text: String,
}

impl<N> Frame<N> {
    fn new(node: N) -> Self {
        Self {
            node,
            next: 0,
            text: String::new(),
        }
    }
}

fn has_element_children<T: ContentTree>(tree: &T, node: T::NodeId) -> bool {
    tree.children(node).iter().any(|child| tree.is_element(*child))
}

/// Text content of an element whose children are all text nodes.
fn leaf_text<T: ContentTree>(tree: &T, node: T::NodeId) -> String {
    tree.children(node)
        .iter()
        .filter_map(|child| match tree.node(*child) {
            NodeRef::Text(text) => Some(text),
            NodeRef::Element { .. } => None,
        })
        .collect()
}
