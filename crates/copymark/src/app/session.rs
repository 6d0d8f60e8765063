//! One scan, order, format, and write pass.

use crate::app::format::render;
use crate::app::order::order;
use crate::domain::errors::CopyError;
use crate::domain::model::{ExtractionResult, Format};
use crate::domain::tree::ContentTree;
use crate::infra::clipboard::Clipboard;

/// Ephemeral value created for a single copy invocation and dropped once the clipboard write
/// has resolved. Nothing is persisted between sessions.
#[derive(Debug, Clone)]
pub struct CopySession<N> {
    elements: Vec<N>,
    format: Format,
    separator: String,
}

impl<N: Copy> CopySession<N> {
    pub fn new(elements: Vec<N>, format: Format, separator: impl Into<String>) -> Self {
        Self {
            elements,
            format,
            separator: separator.into(),
        }
    }

    pub fn elements(&self) -> &[N] {
        &self.elements
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Order and render the tagged elements without touching the clipboard.
    pub fn extract<T>(&self, tree: &T) -> Result<ExtractionResult, CopyError>
    where
        T: ContentTree<NodeId = N>,
    {
        if self.elements.is_empty() {
            return Err(CopyError::NoContentFound);
        }
        let ordered = order(tree, &self.elements);
        Ok(render(tree, &ordered, self.format))
    }

    /// The payload that [`CopySession::run`] would write.
    pub fn payload<T>(&self, tree: &T) -> Result<String, CopyError>
    where
        T: ContentTree<NodeId = N>,
    {
        Ok(self.extract(tree)?.join(&self.separator))
    }

    /// Extract the payload and write it to `clipboard`, consuming the session.
    pub fn run<T>(self, tree: &T, clipboard: &mut Clipboard) -> Result<String, CopyError>
    where
        T: ContentTree<NodeId = N>,
    {
        let payload = self.payload(tree)?;
        clipboard.write(&payload)?;
        tracing::debug!(
            elements = self.elements.len(),
            format = %self.format,
            bytes = payload.len(),
            "copy session finished"
        );
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::scan::{Scanner, ScannerConfig};
    use crate::infra::clipboard::MemoryClipboard;
    use crate::infra::html::parse_document;

    #[test]
    fn empty_session_never_writes() {
        let document = parse_document("<p>nothing tagged</p>");
        let found = Scanner::new().scan(&document, &ScannerConfig::default());
        let memory = MemoryClipboard::new();
        let mut clipboard = Clipboard::with_backends(Some(Box::new(memory.clone())), None);

        let result = CopySession::new(found, Format::Text, "\n\n").run(&document, &mut clipboard);
        assert_eq!(result, Err(CopyError::NoContentFound));
        assert!(memory.writes().is_empty());
    }

    #[test]
    fn writes_ordered_payload() {
        let document = parse_document(r#"<p copy="2">second</p><p copy="1">first</p>"#);
        let found = Scanner::new().scan(&document, &ScannerConfig::default());
        let memory = MemoryClipboard::new();
        let mut clipboard = Clipboard::with_backends(Some(Box::new(memory.clone())), None);

        let payload = CopySession::new(found, Format::Text, " / ")
            .run(&document, &mut clipboard)
            .unwrap();
        assert_eq!(payload, "first / second");
        assert_eq!(memory.last().as_deref(), Some("first / second"));
    }

    #[test]
    fn extraction_has_one_part_per_element() {
        let document = parse_document(r#"<p copy>a</p><p copy>b</p><p copy style="opacity: 0">c</p>"#);
        let found = Scanner::new().scan(&document, &ScannerConfig::default());
        let session = CopySession::new(found, Format::Markdown, "\n");
        assert_eq!(session.extract(&document).unwrap().len(), 2);
    }
}
