use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;

use crate::supervisor::{ProcessSpawner, ProcessSupervisor};

/// Remote key holding the version marker.
pub const MARKER_KEY: &str = "canary.txt";

/// Fixed poll interval. No backoff: a failed tick is simply retried on
/// the next one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Remote object store holding the marker and the file set.
///
/// Production code uses the S3-backed store from caravel-cloud; tests
/// use mockall mocks.
#[allow(async_fn_in_trait)]
pub trait RemoteStore: Send + Sync {
    /// Current content of the marker object.
    async fn fetch_marker(&self) -> Result<String, SyncError>;

    /// All keys in the store's namespace.
    async fn list_keys(&self) -> Result<Vec<String>, SyncError>;

    /// Content of one object.
    async fn fetch_object(&self, key: &str) -> Result<String, SyncError>;
}

/// Polls the remote marker and, on change, pulls the full remote file
/// set into the local artifact tree and restarts the supervised process.
///
/// `last_seen` lives for the poller's lifetime and starts empty, so the
/// first marker observed after startup always triggers a sync.
pub struct SyncPoller<R: RemoteStore, S: ProcessSpawner> {
    store: R,
    supervisor: Arc<Mutex<ProcessSupervisor<S>>>,
    artifact_dir: PathBuf,
    interval: Duration,
    last_seen: String,
}

impl<R: RemoteStore, S: ProcessSpawner> SyncPoller<R, S> {
    pub fn new(
        store: R,
        supervisor: Arc<Mutex<ProcessSupervisor<S>>>,
        artifact_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            supervisor,
            artifact_dir,
            interval: DEFAULT_POLL_INTERVAL,
            last_seen: String::new(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Seed the last-seen marker (e.g. to ignore the version already
    /// running).
    pub fn with_last_seen(mut self, marker: impl Into<String>) -> Self {
        self.last_seen = marker.into();
        self
    }

    pub fn last_seen(&self) -> &str {
        &self.last_seen
    }

    /// Tick on the fixed interval until shutdown. A failed tick is
    /// logged and abandoned; the poller itself never dies.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(true) => {
                            tracing::info!(marker = %self.last_seen, "remote update applied");
                        }
                        Ok(false) => tracing::debug!("no remote updates"),
                        // last_seen was not advanced; the same change is
                        // picked up again on the next tick
                        Err(e) => tracing::warn!(error = %e, "sync tick failed"),
                    }
                }
            }
        }
    }

    /// One poll cycle. Returns `true` if a sync-and-restart happened.
    pub async fn tick(&mut self) -> Result<bool, SyncError> {
        let marker = self.store.fetch_marker().await?;
        if marker == self.last_seen {
            return Ok(false);
        }
        tracing::info!(old = %self.last_seen, new = %marker, "remote marker changed");

        // Full resync, not a delta
        let keys = self.store.list_keys().await?;
        for key in keys.iter().filter(|k| k.as_str() != MARKER_KEY) {
            let Some(local) = resolve_local_path(&self.artifact_dir, key) else {
                tracing::warn!(key = %key, "skipping remote key outside the artifact tree");
                continue;
            };
            let content = self.store.fetch_object(key).await?;
            if let Some(parent) = local.parent() {
                std::fs::create_dir_all(parent).map_err(|e| SyncError::Write {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
            std::fs::write(&local, content).map_err(|e| SyncError::Write {
                path: local.clone(),
                source: e,
            })?;
        }

        self.supervisor
            .lock()
            .await
            .replace(&self.artifact_dir)
            .await
            .map_err(|e| SyncError::Restart {
                detail: e.to_string(),
            })?;

        // Only now is the marker recorded: any earlier failure leaves it
        // unset so the tick is retried
        self.last_seen = marker;
        Ok(true)
    }
}

/// Remote keys are untrusted input; refuse any that would resolve
/// outside the artifact directory.
fn resolve_local_path(artifact_dir: &Path, key: &str) -> Option<PathBuf> {
    let mut local = artifact_dir.to_path_buf();
    for component in Path::new(key).components() {
        match component {
            Component::Normal(part) => local.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if local == artifact_dir {
        return None;
    }
    Some(local)
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to fetch remote marker: {detail}")]
    Marker { detail: String },

    #[error("failed to list remote file set: {detail}")]
    List { detail: String },

    #[error("failed to fetch remote object {key}: {detail}")]
    Fetch { key: String, detail: String },

    #[error("failed to write synced file {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to restart after sync: {detail}")]
    Restart { detail: String },
}
