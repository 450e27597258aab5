use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// A filesystem notification, already filtered down to events worth
/// rebuilding for.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Watches a source tree and forwards [`ChangeEvent`]s into a tokio
/// channel.
///
/// notify's callback is synchronous; a forwarding thread bridges it to
/// the async side. Dropping the watcher stops both the OS watch and the
/// thread.
pub struct SourceWatcher {
    // Held only to keep the OS watch alive.
    _watcher: RecommendedWatcher,
}

impl SourceWatcher {
    pub fn spawn(root: &Path, tx: mpsc::Sender<ChangeEvent>) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        for change in classify(&event) {
                            if tx.blocking_send(change).is_err() {
                                return; // receiver dropped
                            }
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "watcher error"),
                }
            }
        });

        Ok(Self { _watcher: watcher })
    }
}

fn classify(event: &notify::Event) -> Vec<ChangeEvent> {
    use notify::EventKind;

    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Remove(_) => ChangeKind::Removed,
        EventKind::Modify(modify) => {
            // mtime/atime/chmod noise would trigger endless rebuild loops
            if matches!(modify, notify::event::ModifyKind::Metadata(_)) {
                return Vec::new();
            }
            ChangeKind::Modified
        }
        _ => return Vec::new(),
    };

    event
        .paths
        .iter()
        .filter(|path| !is_temp_file(path))
        .map(|path| ChangeEvent {
            path: path.clone(),
            kind,
        })
        .collect()
}

/// Editor temp/backup artifacts.
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
