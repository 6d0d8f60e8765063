//! HTML parsing into a [`Document`].

use html5ever::parse_document as parse_html5;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::domain::model::Attribute;
use crate::infra::document::{Document, NodeId};

/// Parse an HTML document or fragment.
///
/// The `<html>` element becomes the document root. Comments, doctypes and processing
/// instructions are dropped; text is kept verbatim.
pub fn parse_document(source: &str) -> Document {
    let dom = parse_html5(RcDom::default(), Default::default()).one(source);

    let mut document = Document::detached();
    let html = dom
        .document
        .children
        .borrow()
        .iter()
        .find(|child| matches!(child.data, NodeData::Element { .. }))
        .cloned();

    match html.and_then(|html| convert(&mut document, &html)) {
        Some(root) => document.set_root(root),
        None => tracing::warn!("html parser produced no root element"),
    }
    document
}

/// Copy an html5ever subtree into the arena, returning the converted root.
fn convert(document: &mut Document, root: &Handle) -> Option<NodeId> {
    let mut converted_root = None;
    let mut pending: Vec<(Handle, Option<NodeId>)> = vec![(root.clone(), None)];

    while let Some((node, parent)) = pending.pop() {
        match &node.data {
            NodeData::Element { name, attrs, .. } => {
                let attributes = attrs
                    .borrow()
                    .iter()
                    .map(|attr| Attribute::new(attr.name.local.to_string(), attr.value.to_string()))
                    .collect();
                let id = document.push_element(parent, name.local.to_string(), attributes);
                converted_root.get_or_insert(id);
                pending.extend(
                    node.children
                        .borrow()
                        .iter()
                        .rev()
                        .map(|child| (child.clone(), Some(id))),
                );
            }
            NodeData::Text { contents } => {
                if let Some(parent) = parent {
                    document.push_text(parent, contents.borrow().to_string());
                }
            }
            _ => {}
        }
    }

    converted_root
}
