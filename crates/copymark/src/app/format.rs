//! Conversion of ordered tagged elements into the clipboard payload.

use crate::app::extract::{extract_text, is_excluded};
use crate::domain::model::{ExtractionResult, Format};
use crate::domain::tree::{ContentTree, NodeRef};

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Render each element in `format`, in the order given.
pub fn render<T: ContentTree>(tree: &T, elements: &[T::NodeId], format: Format) -> ExtractionResult {
    let parts = elements
        .iter()
        .map(|element| match format {
            Format::Text => extract_text(tree, *element),
            Format::Markdown => to_markdown(tree, *element),
            Format::Html => to_html(tree, *element),
        })
        .collect();
    ExtractionResult::new(parts)
}

/// Render and join with `separator`.
pub fn format<T: ContentTree>(
    tree: &T,
    elements: &[T::NodeId],
    format: Format,
    separator: &str,
) -> String {
    render(tree, elements, format).join(separator)
}

/// Extracted text with a structural prefix chosen by tag.
pub fn to_markdown<T: ContentTree>(tree: &T, element: T::NodeId) -> String {
    let text = extract_text(tree, element);
    let tag = tree.tag_name(element).unwrap_or_default().to_ascii_lowercase();
    match markdown_prefix(&tag) {
        Some(prefix) => format!("{prefix}{text}"),
        None => text,
    }
}

fn markdown_prefix(tag: &str) -> Option<String> {
    match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag[1..].parse::<usize>().ok()?;
            Some(format!("{} ", "#".repeat(level)))
        }
        "li" => Some("- ".to_owned()),
        "blockquote" => Some("> ".to_owned()),
        _ => None,
    }
}

/// Markup of `element` as if it were cloned with every `no-copy` subtree removed.
pub fn to_html<T: ContentTree>(tree: &T, element: T::NodeId) -> String {
    let mut out = String::new();
    if !is_excluded(tree, element) {
        write_node(tree, element, &mut out);
    }
    out
}

enum Step<N> {
    Open(N),
    Close(N),
}

fn write_node<T: ContentTree>(tree: &T, root: T::NodeId, out: &mut String) {
    let mut steps = vec![Step::Open(root)];

    while let Some(step) = steps.pop() {
        let node = match step {
            Step::Open(node) => node,
            Step::Close(node) => {
                if let Some(tag) = tree.tag_name(node) {
                    out.push_str("</");
                    out.push_str(tag);
                    out.push('>');
                }
                continue;
            }
        };

        match tree.node(node) {
            NodeRef::Text(text) => escape_text(text, out),
            NodeRef::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for attribute in attributes {
                    out.push(' ');
                    out.push_str(&attribute.name);
                    out.push_str("=\"");
                    escape_attribute(&attribute.value, out);
                    out.push('"');
                }
                out.push('>');

                if VOID_ELEMENTS.contains(&tag) {
                    continue;
                }

                steps.push(Step::Close(node));
                steps.extend(
                    tree.children(node)
                        .iter()
                        .rev()
                        .filter(|child| !(tree.is_element(**child) && is_excluded(tree, **child)))
                        .map(|child| Step::Open(*child)),
                );
            }
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            other => out.push(other),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            other => out.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::order::order;
    use crate::app::scan::{Scanner, ScannerConfig};
    use crate::infra::document::Document;
    use crate::infra::html::parse_document;

    const SCENARIO: &str =
        r#"<h1 copy="1">Title</h1><button no-copy>X</button><p copy="2">Body text</p>"#;

    fn copy(source: &str, format_kind: Format) -> String {
        let document = parse_document(source);
        let found = Scanner::new().scan(&document, &ScannerConfig::default());
        let ordered = order(&document, &found);
        format(&document, &ordered, format_kind, "\n\n")
    }

    #[test]
    fn text_scenario() {
        assert_eq!(copy(SCENARIO, Format::Text), "Title\n\nBody text");
    }

    #[test]
    fn markdown_scenario() {
        assert_eq!(copy(SCENARIO, Format::Markdown), "# Title\n\nBody text");
    }

    #[test]
    fn markdown_prefixes_follow_tag_table() {
        let source = r#"<h2 copy="1"> Section </h2><h6 copy="2">Small</h6><ul><li copy="3">Item</li></ul><blockquote copy="4">Quote</blockquote><div copy="5">Plain</div>"#;
        assert_eq!(
            copy(source, Format::Markdown),
            "## Section\n\n###### Small\n\n- Item\n\n> Quote\n\nPlain"
        );
    }

    #[test]
    fn html_drops_excluded_descendants() {
        let source = r#"<div copy class="card">Keep <span no-copy>drop <b>me</b></span><em>this</em></div>"#;
        assert_eq!(
            copy(source, Format::Html),
            r#"<div copy="" class="card">Keep <em>this</em></div>"#
        );
    }

    #[test]
    fn html_of_excluded_element_is_empty() {
        let document = parse_document(r#"<p copy no-copy>secret</p>"#);
        let found = Scanner::new().scan(&document, &ScannerConfig::default());
        assert_eq!(found.len(), 1);
        assert_eq!(to_html(&document, found[0]), "");
    }

    #[test]
    fn html_escapes_text_and_attributes() {
        let source = r#"<p copy title="a &quot;b&quot; &amp; c">1 &lt; 2 &amp;&amp; x<br>y</p>"#;
        assert_eq!(
            copy(source, Format::Html),
            r#"<p copy="" title="a &quot;b&quot; &amp; c">1 &lt; 2 &amp;&amp; x<br>y</p>"#
        );
    }

    #[test]
    fn html_handles_very_deep_trees() {
        let mut document = Document::new("body");
        let root = document.root().unwrap();
        let top = document.append_element(root, "div", &[("copy", "")]);
        let mut parent = top;
        for _ in 0..50_000 {
            parent = document.append_element(parent, "div", &[]);
        }
        document.append_element(parent, "span", &[("no-copy", "")]);
        document.append_text(parent, "bottom");

        let html = to_html(&document, top);
        assert!(html.starts_with(r#"<div copy=""><div><div>"#));
        assert!(html.contains("<div>bottom</div>"));
        assert!(!html.contains("span"));
        assert_eq!(html.matches("<div").count(), 50_001);
        assert_eq!(html.matches("</div>").count(), 50_001);
    }

    #[test]
    fn render_keeps_one_part_per_element() {
        let document = parse_document(r#"<p copy>a</p><p copy no-copy>b</p><p copy>c</p>"#);
        let found = Scanner::new().scan(&document, &ScannerConfig::default());
        let result = render(&document, &found, Format::Text);
        assert_eq!(result.len(), 3);
        assert_eq!(result.parts(), &["a".to_string(), String::new(), "c".to_string()]);
    }
}
