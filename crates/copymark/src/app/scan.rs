//! Marker scanning over a content tree.

use crate::domain::errors::CopyError;
use crate::domain::model::COPY_ATTRIBUTE;
use crate::domain::tree::ContentTree;

/// Configuration inputs for the scanner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScannerConfig {
    /// Keep tagged elements whose computed visibility is off.
    pub include_hidden: bool,
}

impl ScannerConfig {
    pub fn with_include_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }
}

/// Finds every element tagged with the `copy` marker.
#[derive(Debug, Default, Clone, Copy)]
pub struct Scanner;

impl Scanner {
    pub fn new() -> Self {
        Self
    }

    /// Tagged elements in document order. Traversal failures degrade to an empty set.
    pub fn scan<T: ContentTree>(&self, tree: &T, cfg: &ScannerConfig) -> Vec<T::NodeId> {
        match self.try_scan(tree, cfg) {
            Ok(elements) => elements,
            Err(err) => {
                tracing::warn!(error = %err, "scanner error");
                Vec::new()
            }
        }
    }

    /// Like [`Scanner::scan`], but reports traversal failures as [`CopyError::ScanFailed`].
    pub fn try_scan<T: ContentTree>(
        &self,
        tree: &T,
        cfg: &ScannerConfig,
    ) -> Result<Vec<T::NodeId>, CopyError> {
        let root = tree.root()?;
        let mut found = Vec::new();
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            if !tree.is_element(node) {
                continue;
            }
            if tree.has_attribute(node, COPY_ATTRIBUTE) && (cfg.include_hidden || tree.is_visible(node))
            {
                found.push(node);
            }
            stack.extend(tree.children(node).iter().rev().copied());
        }

        tracing::debug!(count = found.len(), include_hidden = cfg.include_hidden, "scanned copy markers");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::document::Document;
    use crate::infra::html::parse_document;

    fn tags<T: ContentTree>(tree: &T, nodes: &[T::NodeId]) -> Vec<String> {
        nodes
            .iter()
            .map(|node| tree.tag_name(*node).unwrap_or_default().to_owned())
            .collect()
    }

    #[test]
    fn finds_markers_in_document_order() {
        let document = parse_document(
            r#"<section><p copy="2">b</p><div><h1 copy>a</h1></div></section><span>skip</span><li copy="x">c</li>"#,
        );
        let found = Scanner::new().scan(&document, &ScannerConfig::default());
        assert_eq!(tags(&document, &found), vec!["p", "h1", "li"]);
    }

    #[test]
    fn hidden_elements_need_include_hidden() {
        let document = parse_document(
            r#"<p copy>shown</p><p copy style="display:none">gone</p><div hidden><p copy>nested</p></div>"#,
        );
        let scanner = Scanner::new();

        let visible = scanner.scan(&document, &ScannerConfig::default());
        assert_eq!(visible.len(), 1);

        let all = scanner.scan(&document, &ScannerConfig::default().with_include_hidden(true));
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn detached_tree_degrades_to_empty() {
        let mut document = Document::new("body");
        let root = document.root().unwrap();
        document.append_element(root, "p", &[("copy", "1")]);
        document.detach(root);

        let scanner = Scanner::new();
        assert!(scanner.scan(&document, &ScannerConfig::default()).is_empty());
        assert!(matches!(
            scanner.try_scan(&document, &ScannerConfig::default()),
            Err(CopyError::ScanFailed(_))
        ));
    }
}
