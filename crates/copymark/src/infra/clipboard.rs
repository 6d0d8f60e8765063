//! Clipboard integration utilities.

use std::io::Write;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use parking_lot::Mutex;

use crate::domain::errors::CopyError;

/// A single way of putting text on the clipboard.
pub trait ClipboardBackend {
    fn name(&self) -> &str;
    fn set_text(&mut self, text: &str) -> Result<()>;
}

/// System clipboard through `arboard`.
pub struct NativeClipboard {
    inner: arboard::Clipboard,
}

impl NativeClipboard {
    /// Open the system clipboard. Fails when no clipboard or display server is reachable.
    pub fn open() -> Result<Self> {
        let inner = arboard::Clipboard::new().context("failed to open system clipboard")?;
        Ok(Self { inner })
    }
}

impl ClipboardBackend for NativeClipboard {
    fn name(&self) -> &str {
        "native"
    }

    fn set_text(&mut self, text: &str) -> Result<()> {
        self.inner
            .set_text(text.to_owned())
            .context("system clipboard rejected text")
    }
}

/// Shell clipboard utilities, tried in order until one succeeds.
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    commands: Vec<Vec<String>>,
}

impl CommandClipboard {
    pub fn platform_default() -> Self {
        Self::with_commands(
            FALLBACK_COMMANDS
                .iter()
                .map(|command| command.iter().map(|part| (*part).to_owned()).collect())
                .collect(),
        )
    }

    pub fn with_commands(commands: Vec<Vec<String>>) -> Self {
        Self { commands }
    }

    pub fn commands(&self) -> &[Vec<String>] {
        &self.commands
    }
}

impl ClipboardBackend for CommandClipboard {
    fn name(&self) -> &str {
        "command"
    }

    fn set_text(&mut self, text: &str) -> Result<()> {
        let mut last_error = None;
        for command in &self.commands {
            match try_command_copy(command, text) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    tracing::debug!(command = ?command, error = %err, "clipboard command failed");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("no clipboard commands available"))
            .context("failed to copy text to clipboard using available commands"))
    }
}

/// In-memory clipboard recording every write. Used for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    writes: Arc<Mutex<Vec<String>>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.writes.lock().last().cloned()
    }
}

impl ClipboardBackend for MemoryClipboard {
    fn name(&self) -> &str {
        "memory"
    }

    fn set_text(&mut self, text: &str) -> Result<()> {
        self.writes.lock().push(text.to_owned());
        Ok(())
    }
}

/// Clipboard writer with a primary backend and an optional fallback.
///
/// The fallback runs when the primary is unavailable, or when it fails and fallback is
/// enabled. With fallback disabled any primary failure is final.
pub struct Clipboard {
    primary: Option<Box<dyn ClipboardBackend>>,
    fallback: Option<Box<dyn ClipboardBackend>>,
    fallback_enabled: bool,
}

impl Clipboard {
    /// Attempt to initialize the system clipboard, with shell utilities as the fallback.
    pub fn new() -> Self {
        Self::with_fallback_commands(Vec::new())
    }

    /// Like [`Clipboard::new`], but with explicit fallback commands. An empty list selects the
    /// platform defaults.
    pub fn with_fallback_commands(commands: Vec<Vec<String>>) -> Self {
        let primary = match NativeClipboard::open() {
            Ok(native) => Some(Box::new(native) as Box<dyn ClipboardBackend>),
            Err(err) => {
                tracing::debug!(error = %err, "native clipboard unavailable");
                None
            }
        };
        let fallback = if commands.is_empty() {
            CommandClipboard::platform_default()
        } else {
            CommandClipboard::with_commands(commands)
        };
        Self {
            primary,
            fallback: Some(Box::new(fallback)),
            fallback_enabled: true,
        }
    }

    pub fn with_backends(
        primary: Option<Box<dyn ClipboardBackend>>,
        fallback: Option<Box<dyn ClipboardBackend>>,
    ) -> Self {
        Self {
            primary,
            fallback,
            fallback_enabled: true,
        }
    }

    pub fn with_fallback_enabled(mut self, enabled: bool) -> Self {
        self.fallback_enabled = enabled;
        self
    }

    pub fn set_fallback_enabled(&mut self, enabled: bool) {
        self.fallback_enabled = enabled;
    }

    pub fn fallback_enabled(&self) -> bool {
        self.fallback_enabled
    }

    /// Copy text, falling back to the secondary backend if allowed.
    pub fn write(&mut self, text: &str) -> Result<(), CopyError> {
        match self.primary.as_mut() {
            Some(primary) => match primary.set_text(text) {
                Ok(()) => {
                    tracing::debug!(backend = primary.name(), bytes = text.len(), "copied to clipboard");
                    return Ok(());
                }
                Err(err) if !self.fallback_enabled => {
                    return Err(CopyError::CopyFailed(format!("{err:#}")));
                }
                Err(err) => {
                    tracing::warn!(backend = primary.name(), error = %err, "primary clipboard failed, using fallback");
                }
            },
            None if !self.fallback_enabled => {
                return Err(CopyError::CopyFailed(
                    "primary clipboard unavailable and fallback is disabled".into(),
                ));
            }
            None => {}
        }

        let fallback = self
            .fallback
            .as_mut()
            .ok_or_else(|| CopyError::CopyFailed("no fallback clipboard configured".into()))?;
        fallback
            .set_text(text)
            .map_err(|err| CopyError::CopyFailed(format!("{err:#}")))?;
        tracing::debug!(backend = fallback.name(), bytes = text.len(), "copied to clipboard");
        Ok(())
    }
}

impl Default for Clipboard {
    fn default() -> Self {
        Self::new()
    }
}

/// A spawned clipboard helper. Dropping the guard kills the helper if it is still running
/// and reaps it, so no helper outlives its copy attempt.
struct HelperProcess {
    child: Child,
    program: String,
}

impl HelperProcess {
    fn spawn(program: &str, args: &[String]) -> Result<Self> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn clipboard command: {program}"))?;
        Ok(Self {
            child,
            program: program.to_owned(),
        })
    }

    fn feed(&mut self, text: &str) -> Result<()> {
        let mut stdin = self
            .child
            .stdin
            .take()
            .context("clipboard command has no stdin")?;
        stdin
            .write_all(text.as_bytes())
            .context("failed to write clipboard contents")
    }

    fn wait(&mut self) -> Result<ExitStatus> {
        self.child
            .wait()
            .with_context(|| format!("clipboard command did not exit cleanly: {}", self.program))
    }
}

impl Drop for HelperProcess {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

fn try_command_copy(command: &[String], text: &str) -> Result<()> {
    let (program, args) = command
        .split_first()
        .context("clipboard command missing program")?;

    let mut helper = HelperProcess::spawn(program, args)?;
    helper.feed(text)?;
    let status = helper.wait()?;
    if status.success() {
        Ok(())
    } else {
        Err(anyhow!("clipboard command {program} exited with status {status}"))
    }
}

#[cfg(target_os = "macos")]
const FALLBACK_COMMANDS: &[&[&str]] = &[&["pbcopy"]];

#[cfg(all(unix, not(target_os = "macos")))]
const FALLBACK_COMMANDS: &[&[&str]] = &[
    &["wl-copy"],
    &["xclip", "-selection", "clipboard"],
    &["xsel", "--clipboard", "--input"],
];

#[cfg(target_os = "windows")]
const FALLBACK_COMMANDS: &[&[&str]] = &[&["powershell.exe", "-NoProfile", "-Command", "Set-Clipboard"]];

#[cfg(not(any(unix, target_os = "windows")))]
const FALLBACK_COMMANDS: &[&[&str]] = &[];
