//! Arena-backed content tree with mutation observers.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::errors::TreeError;
use crate::domain::model::{Attribute, COPY_ATTRIBUTE, NO_COPY_ATTRIBUTE};
use crate::domain::tree::{ContentTree, NodeRef};

/// Tags that never take part in layout.
const UNRENDERED_TAGS: &[&str] = &["head", "script", "style", "template", "title", "meta", "link"];

static STYLE_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([a-z-]+)\s*:\s*([^;]+)").expect("style declaration regex should compile")
});

/// Handle to a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: String,
        attributes: Vec<Attribute>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A single observed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    /// Children of `target` were inserted or removed.
    ChildList { target: NodeId },
    /// An attribute of `target` was set or removed.
    Attribute { target: NodeId, name: String },
    /// The contents of the text node `target` changed.
    CharacterData { target: NodeId },
}

/// Which mutations an observer wants to hear about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    /// When set, only attribute changes for these names are delivered.
    pub attribute_filter: Option<Vec<String>>,
}

impl ObserveOptions {
    /// Structural changes plus changes to the `copy` and `no-copy` attributes.
    pub fn copy_markers() -> Self {
        Self {
            child_list: true,
            attributes: true,
            character_data: false,
            attribute_filter: Some(vec![COPY_ATTRIBUTE.into(), NO_COPY_ATTRIBUTE.into()]),
        }
    }

    fn matches(&self, record: &MutationRecord) -> bool {
        match record {
            MutationRecord::ChildList { .. } => self.child_list,
            MutationRecord::CharacterData { .. } => self.character_data,
            MutationRecord::Attribute { name, .. } => {
                self.attributes
                    && self
                        .attribute_filter
                        .as_ref()
                        .is_none_or(|filter| filter.iter().any(|allowed| allowed == name))
            }
        }
    }
}

/// Identifies a registered observer for [`Document::disconnect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

pub type MutationCallback = Box<dyn Fn(&MutationRecord) + Send + Sync>;

struct Observer {
    id: ObserverId,
    options: ObserveOptions,
    callback: MutationCallback,
}

/// Mutable content tree. Nodes live in an arena and are never freed; detached nodes simply
/// stop being reachable from the root.
pub struct Document {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    observers: Vec<Observer>,
    next_observer: u64,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.nodes.len())
            .field("root", &self.root)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Document {
    /// Create a document whose root is an empty element.
    pub fn new(root_tag: &str) -> Self {
        let mut document = Self {
            nodes: Vec::new(),
            root: None,
            observers: Vec::new(),
            next_observer: 0,
        };
        let root = document.push_node(
            NodeKind::Element {
                tag: root_tag.to_ascii_lowercase(),
                attributes: Vec::new(),
            },
            None,
        );
        document.root = Some(root);
        document
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Append a new element under `parent` and return it.
    pub fn append_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> NodeId {
        let attributes = attributes
            .iter()
            .map(|(name, value)| Attribute::new(*name, *value))
            .collect();
        self.append_node(
            parent,
            NodeKind::Element {
                tag: tag.to_ascii_lowercase(),
                attributes,
            },
        )
    }

    /// Append a text node under `parent` and return it.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.append_node(parent, NodeKind::Text(text.to_owned()))
    }

    /// Set (or replace) an attribute on an element. Text nodes are left untouched.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let NodeKind::Element { attributes, .. } = &mut self.nodes[id.0].kind else {
            return;
        };
        match attributes.iter_mut().find(|attr| attr.name == name) {
            Some(existing) => existing.value = value.to_owned(),
            None => attributes.push(Attribute::new(name, value)),
        }
        self.notify(MutationRecord::Attribute {
            target: id,
            name: name.to_owned(),
        });
    }

    /// Remove an attribute. Returns whether it was present.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> bool {
        let NodeKind::Element { attributes, .. } = &mut self.nodes[id.0].kind else {
            return false;
        };
        let before = attributes.len();
        attributes.retain(|attr| attr.name != name);
        let removed = attributes.len() != before;
        if removed {
            self.notify(MutationRecord::Attribute {
                target: id,
                name: name.to_owned(),
            });
        }
        removed
    }

    /// Replace the contents of a text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let NodeKind::Text(contents) = &mut self.nodes[id.0].kind {
            *contents = text.to_owned();
            self.notify(MutationRecord::CharacterData { target: id });
        }
    }

    /// Remove a node (and its subtree) from the tree. Detaching the root leaves the document
    /// without an attached root.
    pub fn detach(&mut self, id: NodeId) {
        if self.root == Some(id) {
            self.root = None;
            self.notify(MutationRecord::ChildList { target: id });
            return;
        }

        let Some(parent) = self.nodes[id.0].parent.take() else {
            return;
        };
        self.nodes[parent.0].children.retain(|child| *child != id);
        self.notify(MutationRecord::ChildList { target: parent });
    }

    /// Register a mutation callback. Callbacks run synchronously on the mutating thread and
    /// should only hand the record off.
    pub fn observe(&mut self, options: ObserveOptions, callback: MutationCallback) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push(Observer {
            id,
            options,
            callback,
        });
        id
    }

    /// Drop a previously registered observer. Returns whether it was registered.
    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|observer| observer.id != id);
        self.observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn detached() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            observers: Vec::new(),
            next_observer: 0,
        }
    }

    pub(crate) fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    pub(crate) fn push_element(
        &mut self,
        parent: Option<NodeId>,
        tag: String,
        attributes: Vec<Attribute>,
    ) -> NodeId {
        let id = self.push_node(NodeKind::Element { tag, attributes }, parent);
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    pub(crate) fn push_text(&mut self, parent: NodeId, text: String) -> NodeId {
        let id = self.push_node(NodeKind::Text(text), Some(parent));
        self.nodes[parent.0].children.push(id);
        id
    }

    fn append_node(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.push_node(kind, Some(parent));
        self.nodes[parent.0].children.push(id);
        self.notify(MutationRecord::ChildList { target: parent });
        id
    }

    fn push_node(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent,
            children: Vec::new(),
        });
        id
    }

    fn notify(&self, record: MutationRecord) {
        for observer in &self.observers {
            if observer.options.matches(&record) {
                (observer.callback)(&record);
            }
        }
    }

    fn is_rendered(&self, id: NodeId, style: &InlineStyle) -> bool {
        let NodeKind::Element { tag, .. } = &self.nodes[id.0].kind else {
            return true;
        };
        !UNRENDERED_TAGS.contains(&tag.as_str())
            && !self.has_attribute(id, "hidden")
            && style.display.as_deref() != Some("none")
    }
}

impl ContentTree for Document {
    type NodeId = NodeId;

    fn root(&self) -> Result<NodeId, TreeError> {
        self.root.ok_or(TreeError::Detached)
    }

    fn node(&self, id: NodeId) -> NodeRef<'_> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { tag, attributes } => NodeRef::Element { tag, attributes },
            NodeKind::Text(text) => NodeRef::Text(text),
        }
    }

    fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    fn is_visible(&self, id: NodeId) -> bool {
        let own_style = InlineStyle::of(self, id);
        let mut visibility = own_style.visibility.clone();
        let mut top = id;
        let mut current = Some(id);

        while let Some(node) = current {
            let style = if node == id {
                own_style.clone()
            } else {
                InlineStyle::of(self, node)
            };
            if !self.is_rendered(node, &style) {
                return false;
            }
            if visibility.is_none() {
                visibility = style.visibility;
            }
            top = node;
            current = self.parent(node);
        }

        // Nodes cut off from the root are not laid out.
        if self.root != Some(top) {
            return false;
        }
        if matches!(visibility.as_deref(), Some("hidden" | "collapse")) {
            return false;
        }
        own_style.opacity.is_none_or(|opacity| opacity > 0.0)
    }
}

/// The subset of inline `style` declarations that affect visibility.
#[derive(Debug, Clone, Default)]
struct InlineStyle {
    display: Option<String>,
    visibility: Option<String>,
    opacity: Option<f32>,
}

impl InlineStyle {
    fn of(document: &Document, id: NodeId) -> Self {
        document
            .attribute(id, "style")
            .map(Self::parse)
            .unwrap_or_default()
    }

    fn parse(source: &str) -> Self {
        let mut style = Self::default();
        for capture in STYLE_DECLARATION.captures_iter(source) {
            let property = capture[1].to_ascii_lowercase();
            let value = capture[2]
                .trim()
                .trim_end_matches("!important")
                .trim()
                .to_ascii_lowercase();
            match property.as_str() {
                "display" => style.display = Some(value),
                "visibility" => style.visibility = Some(value),
                "opacity" => style.opacity = parse_opacity(&value),
                _ => {}
            }
        }
        style
    }
}

fn parse_opacity(value: &str) -> Option<f32> {
    match value.strip_suffix('%') {
        Some(percent) => percent.trim().parse::<f32>().ok().map(|p| p / 100.0),
        None => value.parse::<f32>().ok(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn recorder(document: &mut Document, options: ObserveOptions) -> Arc<Mutex<Vec<MutationRecord>>> {
        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = records.clone();
        document.observe(
            options,
            Box::new(move |record| sink.lock().unwrap().push(record.clone())),
        );
        records
    }

    #[test]
    fn marker_observers_ignore_unrelated_attributes() {
        let mut document = Document::new("body");
        let root = document.root().unwrap();
        let records = recorder(&mut document, ObserveOptions::copy_markers());

        let heading = document.append_element(root, "h1", &[]);
        document.set_attribute(heading, "class", "title");
        document.set_attribute(heading, "copy", "1");
        document.remove_attribute(heading, "copy");
        let text = document.append_text(heading, "hi");
        document.set_text(text, "hello");

        let records = records.lock().unwrap();
        assert_eq!(
            *records,
            vec![
                MutationRecord::ChildList { target: root },
                MutationRecord::Attribute {
                    target: heading,
                    name: "copy".into()
                },
                MutationRecord::Attribute {
                    target: heading,
                    name: "copy".into()
                },
                MutationRecord::ChildList { target: heading },
            ]
        );
    }

    #[test]
    fn disconnected_observers_stop_receiving() {
        let mut document = Document::new("body");
        let root = document.root().unwrap();
        let records = Arc::new(Mutex::new(0usize));
        let sink = records.clone();
        let id = document.observe(
            ObserveOptions::copy_markers(),
            Box::new(move |_| *sink.lock().unwrap() += 1),
        );

        document.append_element(root, "p", &[]);
        assert!(document.disconnect(id));
        document.append_element(root, "p", &[]);

        assert_eq!(*records.lock().unwrap(), 1);
        assert!(!document.disconnect(id));
    }

    #[test]
    fn detaching_the_root_detaches_the_document() {
        let mut document = Document::new("body");
        let root = document.root().unwrap();
        document.detach(root);
        assert_eq!(document.root(), Err(TreeError::Detached));
    }

    #[test]
    fn inline_styles_and_ancestors_drive_visibility() {
        let mut document = Document::new("body");
        let root = document.root().unwrap();
        let shown = document.append_element(root, "p", &[]);
        let none = document.append_element(root, "div", &[("style", "display: none")]);
        let inside_none = document.append_element(none, "p", &[]);
        let faded = document.append_element(root, "p", &[("style", "opacity:0")]);
        let hidden_attr = document.append_element(root, "p", &[("hidden", "")]);
        let invisible = document.append_element(root, "div", &[("style", "visibility: hidden")]);
        let revealed = document.append_element(invisible, "p", &[("style", "visibility: visible")]);
        let still_hidden = document.append_element(invisible, "p", &[]);

        assert!(document.is_visible(shown));
        assert!(!document.is_visible(none));
        assert!(!document.is_visible(inside_none));
        assert!(!document.is_visible(faded));
        assert!(!document.is_visible(hidden_attr));
        assert!(!document.is_visible(invisible));
        assert!(document.is_visible(revealed));
        assert!(!document.is_visible(still_hidden));
    }

    #[test]
    fn detached_subtrees_are_not_visible() {
        let mut document = Document::new("body");
        let root = document.root().unwrap();
        let section = document.append_element(root, "section", &[]);
        let paragraph = document.append_element(section, "p", &[]);
        document.detach(section);
        assert!(!document.is_visible(paragraph));
    }

    #[test]
    fn parses_important_and_percent_opacity() {
        let style = InlineStyle::parse("DISPLAY: None !important; opacity: 0%");
        assert_eq!(style.display.as_deref(), Some("none"));
        assert_eq!(style.opacity, Some(0.0));
    }
}
