//! Copy button state machine and its presentation snapshot.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use parking_lot::RwLock;
use serde::Serialize;

use crate::app::options::{ButtonOptions, CopyContext, Variant};
use crate::app::scan::{Scanner, ScannerConfig};
use crate::app::session::CopySession;
use crate::app::watch::{ChangeWatcher, DocumentSource};
use crate::domain::errors::CopyError;
use crate::domain::tree::ContentTree;
use crate::infra::clipboard::Clipboard;
use crate::infra::document::{Document, NodeId};

const IDLE_LABEL: &str = "Copy";
const COPYING_LABEL: &str = "Copying...";
const SUCCESS_LABEL: &str = "Copied!";
const NO_CONTENT_LABEL: &str = "No content to copy";
const FAILED_LABEL: &str = "Failed to copy";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonState {
    Idle,
    Copying,
    Success,
    Error(CopyError),
}

impl ButtonState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonState::Idle => "idle",
            ButtonState::Copying => "copying",
            ButtonState::Success => "success",
            ButtonState::Error(_) => "error",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ButtonState::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Icon {
    Copy,
    Spinner,
    Check,
    Cross,
}

/// What a renderer needs to draw the button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonView {
    pub state: &'static str,
    pub label: String,
    pub icon: Icon,
    pub disabled: bool,
    pub busy: bool,
    pub variant: Variant,
    pub icon_only: bool,
}

/// Proof that a copy cycle was started. Handed back to [`CopyButton::finish_at`].
#[derive(Debug)]
#[must_use = "a started copy cycle must be finished"]
pub struct CopyTicket {
    cycle: u64,
}

/// One copy button: owns its state and drives `idle -> copying -> success|error -> idle`.
#[derive(Debug)]
pub struct CopyButton {
    options: ButtonOptions,
    context: CopyContext,
    state: ButtonState,
    revert_at: Option<Instant>,
    cycle: u64,
}

impl CopyButton {
    pub fn new(options: ButtonOptions, context: CopyContext) -> Self {
        Self {
            options,
            context,
            state: ButtonState::Idle,
            revert_at: None,
            cycle: 0,
        }
    }

    pub fn state(&self) -> &ButtonState {
        &self.state
    }

    pub fn options(&self) -> &ButtonOptions {
        &self.options
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_idle()
    }

    /// When the current success or error state will revert, if any.
    pub fn revert_at(&self) -> Option<Instant> {
        self.revert_at
    }

    pub fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig::default().with_include_hidden(self.options.include_hidden)
    }

    /// Enter `copying`. Returns `None` while a previous cycle has not reverted yet.
    pub fn begin_at(&mut self, now: Instant) -> Option<CopyTicket> {
        self.tick_at(now);
        if !self.state.is_idle() {
            tracing::debug!(state = self.state.as_str(), "copy trigger rejected");
            return None;
        }
        self.cycle += 1;
        self.state = ButtonState::Copying;
        Some(CopyTicket { cycle: self.cycle })
    }

    /// Settle the cycle started by `ticket`. Stale tickets are ignored.
    pub fn finish_at(
        &mut self,
        now: Instant,
        ticket: CopyTicket,
        result: Result<String, CopyError>,
    ) -> bool {
        if ticket.cycle != self.cycle || self.state != ButtonState::Copying {
            tracing::warn!(cycle = ticket.cycle, "ignoring stale copy result");
            return false;
        }

        match result {
            Ok(payload) => {
                self.state = ButtonState::Success;
                self.revert_at = Some(now + self.options.resolved_success_revert(&self.context));
                if let Some(hook) = self.options.resolved_success_hook(&self.context) {
                    hook(&payload);
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "copy failed");
                if let Some(hook) = self.options.resolved_error_hook(&self.context) {
                    hook(&err);
                }
                self.state = ButtonState::Error(err);
                self.revert_at = Some(now + self.options.resolved_error_revert(&self.context));
            }
        }
        true
    }

    /// Run one full copy cycle over the given tagged elements. Returns `None` when the
    /// trigger was rejected.
    pub fn trigger_at<T: ContentTree>(
        &mut self,
        now: Instant,
        tree: &T,
        elements: Vec<T::NodeId>,
        clipboard: &mut Clipboard,
    ) -> Option<Result<String, CopyError>> {
        let ticket = self.begin_at(now)?;
        clipboard.set_fallback_enabled(self.options.fallback_enabled);
        let session = CopySession::new(
            elements,
            self.options.resolved_format(&self.context),
            self.options.resolved_separator(&self.context),
        );
        let result = session.run(tree, clipboard);
        self.finish_at(now, ticket, result.clone());
        Some(result)
    }

    /// Scan `tree` and run one copy cycle now.
    pub fn trigger<T: ContentTree>(
        &mut self,
        tree: &T,
        clipboard: &mut Clipboard,
    ) -> Option<Result<String, CopyError>> {
        let elements = Scanner::new().scan(tree, &self.scanner_config());
        self.trigger_at(Instant::now(), tree, elements, clipboard)
    }

    /// Apply a due revert. Returns whether the state changed.
    pub fn tick_at(&mut self, now: Instant) -> bool {
        match self.revert_at {
            Some(deadline) if now >= deadline => {
                self.revert_at = None;
                self.state = ButtonState::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn view(&self) -> ButtonView {
        let (label, icon) = match &self.state {
            ButtonState::Idle => (
                self.options
                    .label
                    .clone()
                    .unwrap_or_else(|| IDLE_LABEL.to_owned()),
                Icon::Copy,
            ),
            ButtonState::Copying => (COPYING_LABEL.to_owned(), Icon::Spinner),
            ButtonState::Success => (SUCCESS_LABEL.to_owned(), Icon::Check),
            ButtonState::Error(err) => (error_label(err).to_owned(), Icon::Cross),
        };
        ButtonView {
            state: self.state.as_str(),
            label,
            icon,
            disabled: !self.state.is_idle(),
            busy: self.state == ButtonState::Copying,
            variant: self.options.variant,
            icon_only: self.options.icon_only,
        }
    }
}

/// A [`CopyButton`] bound to a live document. Its element set comes from a
/// [`ChangeWatcher`] built from the button's `include_hidden` and `debounce` options, so a
/// trigger copies whatever the last debounced scan published.
pub struct LiveCopyButton {
    button: CopyButton,
    document: Arc<RwLock<Document>>,
    watcher: ChangeWatcher<NodeId>,
}

impl LiveCopyButton {
    pub fn attach(
        options: ButtonOptions,
        context: CopyContext,
        document: Arc<RwLock<Document>>,
    ) -> Result<Self> {
        let button = CopyButton::new(options, context);
        let cfg = button.scanner_config();
        let scanned = document.clone();
        let watcher = ChangeWatcher::start(
            DocumentSource::new(document.clone()),
            button.options.debounce,
            move || Scanner::new().scan(&*scanned.read(), &cfg),
            None,
        )?;
        Ok(Self {
            button,
            document,
            watcher,
        })
    }

    pub fn button(&self) -> &CopyButton {
        &self.button
    }

    /// The element set the next trigger will copy.
    pub fn elements(&self) -> Vec<NodeId> {
        self.watcher.elements()
    }

    /// Number of debounced rescans since the button was attached.
    pub fn generation(&self) -> u64 {
        self.watcher.generation()
    }

    pub fn trigger_at(
        &mut self,
        now: Instant,
        clipboard: &mut Clipboard,
    ) -> Option<Result<String, CopyError>> {
        let elements = self.watcher.elements();
        let document = self.document.read();
        self.button.trigger_at(now, &*document, elements, clipboard)
    }

    pub fn trigger(&mut self, clipboard: &mut Clipboard) -> Option<Result<String, CopyError>> {
        self.trigger_at(Instant::now(), clipboard)
    }

    pub fn tick_at(&mut self, now: Instant) -> bool {
        self.button.tick_at(now)
    }

    pub fn view(&self) -> ButtonView {
        self.button.view()
    }

    /// Stop observing the document. The button keeps its last element set.
    pub fn detach(&mut self) {
        self.watcher.stop();
    }
}

fn error_label(err: &CopyError) -> &'static str {
    match err {
        CopyError::NoContentFound => NO_CONTENT_LABEL,
        CopyError::CopyFailed(_) | CopyError::ScanFailed(_) => FAILED_LABEL,
    }
}
