use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use caravel_build::BuildError;
use tokio::sync::{mpsc, watch, Mutex};

use crate::supervisor::{ProcessSpawner, ProcessSupervisor};
use crate::watcher::ChangeEvent;

/// Default window for collapsing a burst of change events into one
/// rebuild trigger.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Building,
    Running,
    Failed,
}

/// The "rebuild the artifact" side of the loop, abstracted so tests can
/// count and fail builds. The real driver wraps
/// `caravel_build::ArtifactBuilder` in `spawn_blocking`.
#[allow(async_fn_in_trait)]
pub trait RebuildDriver: Send + Sync {
    async fn build(&self) -> Result<PathBuf, BuildError>;
}

/// Change coalescer: watch events in, at most one rebuild-and-restart
/// cycle at a time out.
///
/// Events that arrive while a build is in flight stay buffered in the
/// channel and are drained into exactly one follow-up rebuild once the
/// build finishes — a burst of N edits never causes N rebuilds, and
/// never zero.
pub struct DevLoop<B: RebuildDriver, S: ProcessSpawner> {
    driver: B,
    supervisor: Arc<Mutex<ProcessSupervisor<S>>>,
    events: mpsc::Receiver<ChangeEvent>,
    debounce: Duration,
    state: LoopState,
}

impl<B: RebuildDriver, S: ProcessSpawner> DevLoop<B, S> {
    pub fn new(
        driver: B,
        supervisor: Arc<Mutex<ProcessSupervisor<S>>>,
        events: mpsc::Receiver<ChangeEvent>,
    ) -> Self {
        Self {
            driver,
            supervisor,
            events,
            debounce: DEFAULT_DEBOUNCE,
            state: LoopState::Idle,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Run until shutdown is signalled or the event source closes. The
    /// supervised child is terminated on the way out — no orphans survive
    /// the loop.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                more = self.process_next() => {
                    if !more {
                        break;
                    }
                }
            }
        }

        let mut supervisor = self.supervisor.lock().await;
        if let Err(e) = supervisor.stop().await {
            tracing::warn!(error = %e, "failed to stop supervised process on shutdown");
        }
    }

    /// Wait for the next change, let the burst settle, then run one
    /// rebuild-and-restart cycle. Returns `false` when the event source
    /// has closed.
    pub async fn process_next(&mut self) -> bool {
        let Some(event) = self.events.recv().await else {
            return false;
        };
        tracing::info!(path = %event.path.display(), "change detected");
        self.settle_burst().await;
        self.rebuild_once().await;
        true
    }

    /// Drain events until the burst has settled: each drained event
    /// re-arms the debounce window.
    async fn settle_burst(&mut self) {
        loop {
            match tokio::time::timeout(self.debounce, self.events.recv()).await {
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => break,
            }
        }
    }

    async fn rebuild_once(&mut self) {
        self.state = LoopState::Building;
        match self.driver.build().await {
            Ok(artifact) => {
                let mut supervisor = self.supervisor.lock().await;
                match supervisor.replace(&artifact).await {
                    Ok(handle) => {
                        tracing::info!(pid = handle.pid, port = handle.port, "process replaced");
                        self.state = LoopState::Running;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to restart process");
                        self.state = LoopState::Failed;
                    }
                }
            }
            Err(e) => {
                // The previous process stays up: a failed rebuild must
                // never leave the user with no running process.
                tracing::error!(error = %e, "build failed; previous process left running");
                self.state = LoopState::Failed;
            }
        }
    }
}
