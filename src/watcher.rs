use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::broadcaster::TriggerSender;
use crate::error::{PreviewError, PreviewResult};

/// Watches the diagram source and posts a trigger on every modification.
///
/// The OS watch lives as long as this value; drop it to stop watching.
pub struct FileWatcher {
    path: PathBuf,
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    pub fn start(path: &Path, triggers: TriggerSender) -> PreviewResult<Self> {
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if is_modification(&event.kind) => {
                tracing::debug!(kind = ?event.kind, "source modified");
                triggers.file_changed();
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("watch error: {}", e),
        })
        .map_err(|e| PreviewError::watch(path, e))?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| PreviewError::watch(path, e))?;

        tracing::info!(path = %path.display(), "watching for changes");
        Ok(Self {
            path: path.to_path_buf(),
            _watcher: watcher,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_modification(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Modify(_))
}
