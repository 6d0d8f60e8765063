//! Configuration management utilities.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::domain::model::Format;

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".copymark/config.toml";

pub const DEFAULT_SEPARATOR: &str = "\n\n";
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;
pub const DEFAULT_SUCCESS_REVERT_MS: u64 = 2000;
pub const DEFAULT_ERROR_REVERT_MS: u64 = 2500;

/// Layered configuration loaded from defaults, user, workspace, explicit file, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub feedback: Feedback,
    #[serde(default)]
    pub clipboard: ClipboardSettings,
}

/// Copy defaults shared by every button.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default)]
    format: Option<Format>,
    #[serde(default)]
    separator: Option<String>,
    #[serde(default)]
    include_hidden: Option<bool>,
    #[serde(default)]
    debounce_ms: Option<u64>,
    #[serde(default)]
    fallback_enabled: Option<bool>,
}

impl Defaults {
    pub fn format(&self) -> Format {
        self.format.unwrap_or_default()
    }

    pub fn separator(&self) -> String {
        self.separator
            .clone()
            .unwrap_or_else(|| DEFAULT_SEPARATOR.to_owned())
    }

    pub fn include_hidden(&self) -> bool {
        self.include_hidden.unwrap_or(false)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS))
    }

    pub fn fallback_enabled(&self) -> bool {
        self.fallback_enabled.unwrap_or(true)
    }
}

/// How long the button shows its outcome before reverting to idle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(default)]
    success_revert_ms: Option<u64>,
    #[serde(default)]
    error_revert_ms: Option<u64>,
}

impl Feedback {
    pub fn success_revert(&self) -> Duration {
        Duration::from_millis(self.success_revert_ms.unwrap_or(DEFAULT_SUCCESS_REVERT_MS))
    }

    pub fn error_revert(&self) -> Duration {
        Duration::from_millis(self.error_revert_ms.unwrap_or(DEFAULT_ERROR_REVERT_MS))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardSettings {
    /// Commands tried by the fallback path; empty means platform defaults.
    #[serde(default)]
    fallback_commands: Option<Vec<Vec<String>>>,
}

impl ClipboardSettings {
    pub fn fallback_commands(&self) -> Vec<Vec<String>> {
        self.fallback_commands.clone().unwrap_or_default()
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    format: Option<String>,
    separator: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            format: env::var("COPYMARK_FORMAT").ok(),
            separator: env::var("COPYMARK_SEPARATOR").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(format: &str, separator: &str) -> Self {
        Self {
            format: Some(format.to_owned()),
            separator: Some(separator.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user config, workspace config, and env overrides.
    pub fn load() -> Result<Self> {
        Self::load_with_explicit(None)
    }

    /// Like [`Config::load`], with an extra file layered above the workspace config.
    pub fn load_with_explicit(explicit: Option<&Path>) -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, explicit.map(Path::to_path_buf), env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        explicit: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            layers.push(Self::from_file(&workspace_path)?);
        }

        if let Some(explicit_path) = explicit {
            layers.push(Self::from_file(&explicit_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        apply_env_overrides(merged, env_overrides)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
            .with_context(|| format!("invalid config file: {}", path.display()))
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            defaults: merge_defaults(self.defaults, other.defaults),
            feedback: merge_feedback(self.feedback, other.feedback),
            clipboard: merge_clipboard(self.clipboard, other.clipboard),
        }
    }
}

fn merge_defaults(base: Defaults, overlay: Defaults) -> Defaults {
    Defaults {
        format: overlay.format.or(base.format),
        separator: overlay.separator.or(base.separator),
        include_hidden: overlay.include_hidden.or(base.include_hidden),
        debounce_ms: overlay.debounce_ms.or(base.debounce_ms),
        fallback_enabled: overlay.fallback_enabled.or(base.fallback_enabled),
    }
}

fn merge_feedback(base: Feedback, overlay: Feedback) -> Feedback {
    Feedback {
        success_revert_ms: overlay.success_revert_ms.or(base.success_revert_ms),
        error_revert_ms: overlay.error_revert_ms.or(base.error_revert_ms),
    }
}

fn merge_clipboard(base: ClipboardSettings, overlay: ClipboardSettings) -> ClipboardSettings {
    match overlay.fallback_commands {
        Some(commands) if !commands.is_empty() => ClipboardSettings {
            fallback_commands: Some(commands),
        },
        _ => base,
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("copymark/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()?;
    let root = find_repo_root(&cwd).unwrap_or(cwd);
    Ok(Some(root.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Result<Config> {
    if let Some(format) = env.format {
        let format = format
            .parse::<Format>()
            .context("invalid COPYMARK_FORMAT")?;
        config.defaults.format = Some(format);
    }
    if let Some(separator) = env.separator {
        config.defaults.separator = Some(unescape_separator(&separator));
    }
    Ok(config)
}

/// Expand `\n`, `\t`, `\r` and `\\` so separators can be typed on a command line.
pub fn unescape_separator(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_uses_defaults_when_no_files() {
        let config = Config::load_with_layers(None, None, None, EnvOverrides::default())
            .expect("load default config");
        assert_eq!(config.defaults.format(), Format::Text);
        assert_eq!(config.defaults.separator(), "\n\n");
        assert_eq!(config.defaults.debounce(), Duration::from_millis(100));
        assert!(config.defaults.fallback_enabled());
        assert_eq!(config.feedback.success_revert(), Duration::from_millis(2000));
        assert_eq!(config.feedback.error_revert(), Duration::from_millis(2500));
        assert!(config.clipboard.fallback_commands().is_empty());
    }

    #[test]
    fn merge_global_and_workspace() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let global = temp.path().join("config.toml");
        fs::write(
            &global,
            r#"
[defaults]
format = "markdown"
debounce_ms = 250
[clipboard]
fallback_commands = [["xsel", "--clipboard", "--input"]]
"#,
        )?;

        let workspace_dir = temp.path().join("repo");
        fs::create_dir_all(workspace_dir.join(".copymark"))?;
        fs::create_dir_all(workspace_dir.join(".git"))?;
        fs::write(
            workspace_dir.join(".copymark/config.toml"),
            r#"
[defaults]
separator = " | "
[feedback]
error_revert_ms = 500
"#,
        )?;

        let config = Config::load_with_layers(
            Some(global),
            Some(workspace_dir.join(".copymark/config.toml")),
            None,
            EnvOverrides::default(),
        )?;

        assert_eq!(config.defaults.format(), Format::Markdown);
        assert_eq!(config.defaults.separator(), " | ");
        assert_eq!(config.defaults.debounce(), Duration::from_millis(250));
        assert_eq!(config.feedback.error_revert(), Duration::from_millis(500));
        assert_eq!(config.feedback.success_revert(), Duration::from_millis(2000));
        assert_eq!(
            config.clipboard.fallback_commands(),
            vec![vec!["xsel".to_string(), "--clipboard".into(), "--input".into()]]
        );
        Ok(())
    }

    #[test]
    fn explicit_file_overrides_workspace() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let workspace = temp.path().join("workspace.toml");
        let explicit = temp.path().join("explicit.toml");
        fs::write(&workspace, "[defaults]\nformat = \"markdown\"\n")?;
        fs::write(&explicit, "[defaults]\nformat = \"html\"\n")?;

        let config =
            Config::load_with_layers(None, Some(workspace), Some(explicit), EnvOverrides::default())?;
        assert_eq!(config.defaults.format(), Format::Html);
        Ok(())
    }

    #[test]
    fn env_overrides_take_precedence() -> Result<()> {
        let overrides = EnvOverrides::for_tests("md", "\\n---\\n");
        let config = Config::load_with_layers(None, None, None, overrides)?;
        assert_eq!(config.defaults.format(), Format::Markdown);
        assert_eq!(config.defaults.separator(), "\n---\n");
        Ok(())
    }

    #[test]
    fn unknown_env_format_is_an_error() {
        let overrides = EnvOverrides::for_tests("rtf", "");
        assert!(Config::load_with_layers(None, None, None, overrides).is_err());
    }

    #[test]
    fn invalid_config_returns_error() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let file = temp.path().join("broken.toml");
        fs::write(&file, "this is not toml")?;
        assert!(Config::from_file(&file).is_err());

        fs::write(&file, "[defaults]\nformat = \"rtf\"\n")?;
        assert!(Config::from_file(&file).is_err());
        Ok(())
    }

    #[test]
    fn unescapes_separators() {
        assert_eq!(unescape_separator("\\n\\n"), "\n\n");
        assert_eq!(unescape_separator("a\\tb"), "a\tb");
        assert_eq!(unescape_separator("\\\\n"), "\\n");
        assert_eq!(unescape_separator("end\\"), "end\\");
        assert_eq!(unescape_separator("\\x"), "\\x");
    }
}
