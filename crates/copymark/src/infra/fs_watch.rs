//! File-system change source backed by `notify`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::app::watch::{ChangeNotifier, ChangeSource};

/// Reports changes to a single file. The parent directory is watched so editors that
/// replace the file on save are still seen.
pub struct FileSource {
    path: PathBuf,
    watcher: Option<RecommendedWatcher>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            watcher: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChangeSource for FileSource {
    fn subscribe(&mut self, notifier: ChangeNotifier) -> Result<()> {
        self.unsubscribe();

        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .with_context(|| format!("{} does not name a file", self.path.display()))?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if touches(&event, &file_name) => notifier.notify(),
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "file watch error"),
        })
        .context("failed to create file watcher")?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", dir.display()))?;

        tracing::debug!(path = %self.path.display(), "watching file");
        self.watcher = Some(watcher);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        // Dropping the watcher unregisters it.
        self.watcher = None;
    }
}

fn touches(event: &Event, file_name: &OsString) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event
        .paths
        .iter()
        .any(|path| path.file_name() == Some(file_name.as_os_str()))
}
