use std::sync::Arc;
use std::time::{Duration, Instant};

use copymark::app::options::{ButtonOptions, CopyContext};
use copymark::app::scan::Scanner;
use copymark::domain::errors::CopyError;
use copymark::domain::model::Format;
use copymark::infra::clipboard::{Clipboard, MemoryClipboard};
use copymark::infra::document::Document;
use copymark::infra::html::parse_document;
use copymark::ui::button::{ButtonState, CopyButton};
use insta::assert_snapshot;
use parking_lot::Mutex;

const README: &str = r#"<!doctype html>
<html>
  <head><title copy="0">ignored</title></head>
  <body>
    <article>
      <h2 copy="2">Install</h2>
      <pre copy="3">cargo install copymark</pre>
      <h1 copy="1">Copymark <span no-copy>(beta)</span></h1>
      <li copy="4">Works <em>offline</em></li>
      <p copy="5" style="display: none">hidden note</p>
    </article>
  </body>
</html>"#;

fn memory_clipboard() -> (MemoryClipboard, Clipboard) {
    let memory = MemoryClipboard::new();
    let clipboard = Clipboard::with_backends(Some(Box::new(memory.clone())), None);
    (memory, clipboard)
}

#[test]
fn markdown_payload_follows_markers() {
    let document = parse_document(README);
    let (memory, mut clipboard) = memory_clipboard();
    let mut button = CopyButton::new(
        ButtonOptions::default().with_format(Format::Markdown),
        CopyContext::default(),
    );

    button.trigger(&document, &mut clipboard);
    let payload = memory.last().expect("payload written");
    assert_snapshot!(payload, @r"
    # Copymark

    ## Install

    cargo install copymark

    - Works offline
    ");
}

#[test]
fn html_payload_drops_excluded_subtrees() {
    let document = parse_document(README);
    let (memory, mut clipboard) = memory_clipboard();
    let context = CopyContext {
        default_format: Some(Format::Html),
        default_separator: Some("\n".into()),
        ..CopyContext::default()
    };
    let mut button = CopyButton::new(ButtonOptions::default(), context);

    button.trigger(&document, &mut clipboard);
    let payload = memory.last().expect("payload written");
    assert_eq!(
        payload,
        "<h1 copy=\"1\">Copymark </h1>\n\
         <h2 copy=\"2\">Install</h2>\n\
         <pre copy=\"3\">cargo install copymark</pre>\n\
         <li copy=\"4\">Works <em>offline</em></li>"
    );
}

#[test]
fn hidden_elements_join_when_requested() {
    let document = parse_document(README);
    let (memory, mut clipboard) = memory_clipboard();
    let mut button = CopyButton::new(
        ButtonOptions::default()
            .with_include_hidden(true)
            .with_separator(" | "),
        CopyContext::default(),
    );

    button.trigger(&document, &mut clipboard);
    assert_eq!(
        memory.last().as_deref(),
        Some("ignored | Copymark | Install | cargo install copymark | Works offline | hidden note")
    );
}

#[test]
fn context_hooks_observe_each_outcome() {
    let successes = Arc::new(Mutex::new(Vec::new()));
    let failures = Arc::new(Mutex::new(Vec::new()));
    let (ok_log, err_log) = (successes.clone(), failures.clone());
    let context = CopyContext::default()
        .on_copy_success(move |payload| ok_log.lock().push(payload.to_owned()))
        .on_copy_error(move |err| err_log.lock().push(err.clone()));
    let (_, mut clipboard) = memory_clipboard();
    let mut button = CopyButton::new(ButtonOptions::default(), context);
    let start = Instant::now();

    let empty = Document::new("body");
    let found = Scanner::new().scan(&empty, &button.scanner_config());
    button.trigger_at(start, &empty, found, &mut clipboard);
    assert!(matches!(button.state(), ButtonState::Error(CopyError::NoContentFound)));

    let document = parse_document(r#"<p copy>ready</p>"#);
    let found = Scanner::new().scan(&document, &button.scanner_config());
    assert!(button.trigger_at(start, &document, found.clone(), &mut clipboard).is_none());

    let later = start + Duration::from_millis(2500);
    button.trigger_at(later, &document, found, &mut clipboard);
    assert_eq!(*successes.lock(), vec!["ready".to_string()]);
    assert_eq!(*failures.lock(), vec![CopyError::NoContentFound]);
}
