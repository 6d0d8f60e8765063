//! Copy defaults, per-button options, and how they combine.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::errors::CopyError;
use crate::domain::model::Format;
use crate::infra::config::{
    Config, DEFAULT_DEBOUNCE_MS, DEFAULT_ERROR_REVERT_MS, DEFAULT_SEPARATOR,
    DEFAULT_SUCCESS_REVERT_MS,
};

/// Called with the final payload after a successful copy.
pub type SuccessHook = Arc<dyn Fn(&str) + Send + Sync>;
/// Called with the failure cause after a failed copy.
pub type ErrorHook = Arc<dyn Fn(&CopyError) + Send + Sync>;

/// Pick the first value that is set: the explicit one, then the instance default, then the
/// global default.
pub fn resolve<T>(explicit: Option<T>, instance_default: Option<T>, global_default: T) -> T {
    explicit.or(instance_default).unwrap_or(global_default)
}

/// Visual treatment of a button. Presentation only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum Variant {
    #[default]
    Glass,
    Tech,
    Minimal,
    Floating,
}

/// Defaults shared by every button created from it. Buttons may override any of these.
#[derive(Clone, Default)]
pub struct CopyContext {
    pub default_format: Option<Format>,
    pub default_separator: Option<String>,
    pub on_copy_success: Option<SuccessHook>,
    pub on_copy_error: Option<ErrorHook>,
    pub success_revert: Option<Duration>,
    pub error_revert: Option<Duration>,
}

impl fmt::Debug for CopyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopyContext")
            .field("default_format", &self.default_format)
            .field("default_separator", &self.default_separator)
            .field("on_copy_success", &self.on_copy_success.is_some())
            .field("on_copy_error", &self.on_copy_error.is_some())
            .field("success_revert", &self.success_revert)
            .field("error_revert", &self.error_revert)
            .finish()
    }
}

impl CopyContext {
    /// Build a context from configuration defaults.
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_format: Some(config.defaults.format()),
            default_separator: Some(config.defaults.separator()),
            on_copy_success: None,
            on_copy_error: None,
            success_revert: Some(config.feedback.success_revert()),
            error_revert: Some(config.feedback.error_revert()),
        }
    }

    pub fn on_copy_success(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_copy_success = Some(Arc::new(hook));
        self
    }

    pub fn on_copy_error(mut self, hook: impl Fn(&CopyError) + Send + Sync + 'static) -> Self {
        self.on_copy_error = Some(Arc::new(hook));
        self
    }
}

/// Options of one button instance.
#[derive(Clone)]
pub struct ButtonOptions {
    pub format: Option<Format>,
    pub separator: Option<String>,
    pub include_hidden: bool,
    pub debounce: Duration,
    pub fallback_enabled: bool,
    pub variant: Variant,
    pub icon_only: bool,
    /// Idle label; `Copy` when unset.
    pub label: Option<String>,
    /// How long `success` shows before reverting; the context decides when unset.
    pub success_revert: Option<Duration>,
    pub error_revert: Option<Duration>,
    pub on_copy: Option<SuccessHook>,
    pub on_copy_error: Option<ErrorHook>,
}

impl Default for ButtonOptions {
    fn default() -> Self {
        Self {
            format: None,
            separator: None,
            include_hidden: false,
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            fallback_enabled: true,
            variant: Variant::default(),
            icon_only: false,
            label: None,
            success_revert: None,
            error_revert: None,
            on_copy: None,
            on_copy_error: None,
        }
    }
}

impl fmt::Debug for ButtonOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ButtonOptions")
            .field("format", &self.format)
            .field("separator", &self.separator)
            .field("include_hidden", &self.include_hidden)
            .field("debounce", &self.debounce)
            .field("fallback_enabled", &self.fallback_enabled)
            .field("variant", &self.variant)
            .field("icon_only", &self.icon_only)
            .field("label", &self.label)
            .field("success_revert", &self.success_revert)
            .field("error_revert", &self.error_revert)
            .finish_non_exhaustive()
    }
}

impl ButtonOptions {
    /// Options seeded from configuration; format and separator stay unset so the context
    /// decides them.
    pub fn from_config(config: &Config) -> Self {
        Self {
            include_hidden: config.defaults.include_hidden(),
            debounce: config.defaults.debounce(),
            fallback_enabled: config.defaults.fallback_enabled(),
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    pub fn with_include_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_success_revert(mut self, delay: Duration) -> Self {
        self.success_revert = Some(delay);
        self
    }

    pub fn with_error_revert(mut self, delay: Duration) -> Self {
        self.error_revert = Some(delay);
        self
    }

    pub fn on_copy(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_copy = Some(Arc::new(hook));
        self
    }

    pub fn on_copy_error(mut self, hook: impl Fn(&CopyError) + Send + Sync + 'static) -> Self {
        self.on_copy_error = Some(Arc::new(hook));
        self
    }

    /// Effective format for this button under `context`.
    pub fn resolved_format(&self, context: &CopyContext) -> Format {
        resolve(self.format, context.default_format, Format::Text)
    }

    /// Effective separator for this button under `context`. An explicit empty separator is
    /// kept.
    pub fn resolved_separator(&self, context: &CopyContext) -> String {
        resolve(
            self.separator.clone(),
            context.default_separator.clone(),
            DEFAULT_SEPARATOR.to_owned(),
        )
    }

    pub fn resolved_success_revert(&self, context: &CopyContext) -> Duration {
        resolve(
            self.success_revert,
            context.success_revert,
            Duration::from_millis(DEFAULT_SUCCESS_REVERT_MS),
        )
    }

    pub fn resolved_error_revert(&self, context: &CopyContext) -> Duration {
        resolve(
            self.error_revert,
            context.error_revert,
            Duration::from_millis(DEFAULT_ERROR_REVERT_MS),
        )
    }

    pub fn resolved_success_hook(&self, context: &CopyContext) -> Option<SuccessHook> {
        self.on_copy.clone().or_else(|| context.on_copy_success.clone())
    }

    pub fn resolved_error_hook(&self, context: &CopyContext) -> Option<ErrorHook> {
        self.on_copy_error
            .clone()
            .or_else(|| context.on_copy_error.clone())
    }
}
