use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use caravel_dev::{ProcessSpawner, SupervisionError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnerCall {
    Spawn { pid: u32 },
    Terminate { pid: u32 },
    Kill { pid: u32 },
}

#[derive(Default)]
pub struct SpawnerState {
    pub calls: Vec<SpawnerCall>,
    pub alive: HashSet<u32>,
    /// Set if a spawn ever happened while another child was still alive —
    /// i.e. two processes bound to the port at once.
    pub overlap: bool,
}

/// Process spawner double that records call ordering and tracks which
/// pids are alive. Knobs simulate children that ignore signals and ports
/// that are never released.
pub struct RecordingSpawner {
    pub state: Arc<Mutex<SpawnerState>>,
    next_pid: AtomicU32,
    /// Child ignores the graceful stop signal.
    pub ignore_term: bool,
    /// Child survives even the forceful kill.
    pub immortal: bool,
    /// The port is never reported free.
    pub port_stuck: bool,
}

impl RecordingSpawner {
    pub fn new(state: Arc<Mutex<SpawnerState>>) -> Self {
        Self {
            state,
            next_pid: AtomicU32::new(100),
            ignore_term: false,
            immortal: false,
            port_stuck: false,
        }
    }
}

impl ProcessSpawner for RecordingSpawner {
    async fn spawn(&self, _artifact_dir: &Path, _port: u16) -> Result<u32, SupervisionError> {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if !state.alive.is_empty() {
            state.overlap = true;
        }
        state.alive.insert(pid);
        state.calls.push(SpawnerCall::Spawn { pid });
        Ok(pid)
    }

    async fn signal_terminate(&self, pid: u32) -> Result<(), SupervisionError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(SpawnerCall::Terminate { pid });
        if !self.ignore_term {
            state.alive.remove(&pid);
        }
        Ok(())
    }

    async fn force_kill(&self, pid: u32) -> Result<(), SupervisionError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(SpawnerCall::Kill { pid });
        if !self.immortal {
            state.alive.remove(&pid);
        }
        Ok(())
    }

    async fn wait_exit(&self, pid: u32) -> Result<i32, SupervisionError> {
        loop {
            if !self.state.lock().unwrap().alive.contains(&pid) {
                return Ok(0);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn try_wait(&self, pid: u32) -> Result<Option<i32>, SupervisionError> {
        if self.state.lock().unwrap().alive.contains(&pid) {
            Ok(None)
        } else {
            Ok(Some(0))
        }
    }

    fn port_free(&self, _port: u16) -> bool {
        if self.port_stuck {
            return false;
        }
        self.state.lock().unwrap().alive.is_empty()
    }
}
