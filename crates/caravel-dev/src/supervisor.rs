use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::Instant;

/// Default bound on "wait for the old process to stop / release the port".
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Opaque identity of a supervised process.
///
/// `generation` is strictly increasing: handle N+1 is only ever spawned
/// after handle N's termination was confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    pub generation: u64,
    pub pid: u32,
    pub port: u16,
}

/// Abstraction over child process lifecycle for testability.
///
/// Production code uses [`NodeSpawner`]; tests substitute doubles that
/// record ordering.
#[allow(async_fn_in_trait)]
pub trait ProcessSpawner: Send + Sync {
    /// Start a process from the artifact directory, bound to `port`.
    /// Returns its pid.
    async fn spawn(&self, artifact_dir: &Path, port: u16) -> Result<u32, SupervisionError>;

    /// Deliver the graceful stop signal.
    async fn signal_terminate(&self, pid: u32) -> Result<(), SupervisionError>;

    /// Forceful kill, used when the graceful signal is ignored.
    async fn force_kill(&self, pid: u32) -> Result<(), SupervisionError>;

    /// Resolve once the process has exited, yielding its exit code.
    async fn wait_exit(&self, pid: u32) -> Result<i32, SupervisionError>;

    /// Non-blocking exit check.
    async fn try_wait(&self, pid: u32) -> Result<Option<i32>, SupervisionError>;

    /// Whether the configured port is currently bindable.
    fn port_free(&self, port: u16) -> bool;
}

/// Owns at most one running child process.
///
/// `replace` establishes a total order on process identities: the new
/// process is spawned only after the old one's exit is confirmed and the
/// port has been released, never concurrently. Callers that share a
/// supervisor (dev loop, sync poller) must wrap it in
/// `Arc<tokio::sync::Mutex<_>>` so replace/stop are serialized.
pub struct ProcessSupervisor<S: ProcessSpawner> {
    spawner: S,
    port: u16,
    stop_timeout: Duration,
    generation: u64,
    current: Option<ProcessHandle>,
}

impl<S: ProcessSpawner> ProcessSupervisor<S> {
    pub fn new(spawner: S, port: u16) -> Self {
        Self {
            spawner,
            port,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            generation: 0,
            current: None,
        }
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn current(&self) -> Option<&ProcessHandle> {
        self.current.as_ref()
    }

    /// Stop the current process (if any) and start a new one from the
    /// given artifact.
    pub async fn replace(&mut self, artifact_dir: &Path) -> Result<ProcessHandle, SupervisionError> {
        if let Some(old) = self.current.take() {
            if let Err(e) = self.stop_process(&old).await {
                // The survivor stays tracked so a later stop can retry
                self.current = Some(old);
                return Err(e);
            }
        }
        self.wait_port_released().await?;

        let pid = self.spawner.spawn(artifact_dir, self.port).await?;
        self.generation += 1;
        let handle = ProcessHandle {
            generation: self.generation,
            pid,
            port: self.port,
        };
        tracing::info!(pid, generation = handle.generation, port = self.port, "process started");
        self.current = Some(handle.clone());
        Ok(handle)
    }

    /// Terminate the current process, if any.
    pub async fn stop(&mut self) -> Result<(), SupervisionError> {
        if let Some(old) = self.current.take() {
            if let Err(e) = self.stop_process(&old).await {
                self.current = Some(old);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Report an unexpected exit of the current process without
    /// respawning; whether to restart is the driver's decision.
    pub async fn check_exit(&mut self) -> Result<Option<i32>, SupervisionError> {
        let Some(handle) = &self.current else {
            return Ok(None);
        };
        match self.spawner.try_wait(handle.pid).await? {
            Some(code) => {
                tracing::warn!(pid = handle.pid, code, "supervised process exited unexpectedly");
                self.current = None;
                Ok(Some(code))
            }
            None => Ok(None),
        }
    }

    async fn stop_process(&self, handle: &ProcessHandle) -> Result<(), SupervisionError> {
        // Already gone (crashed between replacements)?
        if let Some(code) = self.spawner.try_wait(handle.pid).await? {
            tracing::info!(pid = handle.pid, code, "process had already exited");
            return Ok(());
        }

        self.spawner.signal_terminate(handle.pid).await?;
        match tokio::time::timeout(self.stop_timeout, self.spawner.wait_exit(handle.pid)).await {
            Ok(result) => {
                result?;
                return Ok(());
            }
            Err(_) => {
                tracing::warn!(pid = handle.pid, "graceful stop timed out, escalating to kill");
            }
        }

        self.spawner.force_kill(handle.pid).await?;
        match tokio::time::timeout(self.stop_timeout, self.spawner.wait_exit(handle.pid)).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(SupervisionError::StopTimeout { pid: handle.pid }),
        }
    }

    /// The old process exiting does not instantly release its socket;
    /// spawning into a still-bound port fails with a bind conflict.
    async fn wait_port_released(&self) -> Result<(), SupervisionError> {
        let deadline = Instant::now() + self.stop_timeout;
        while !self.spawner.port_free(self.port) {
            if Instant::now() >= deadline {
                return Err(SupervisionError::PortConflict { port: self.port });
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        Ok(())
    }
}

/// Real spawner: runs `node index.js` inside the artifact directory.
pub struct NodeSpawner {
    program: String,
    children: Arc<tokio::sync::Mutex<HashMap<u32, Child>>>,
}

impl NodeSpawner {
    pub fn new() -> Self {
        Self::with_program("node")
    }

    /// Substitute the runtime binary (used by tests).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            children: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
        }
    }
}

impl Default for NodeSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSpawner for NodeSpawner {
    async fn spawn(&self, artifact_dir: &Path, port: u16) -> Result<u32, SupervisionError> {
        let mut child = Command::new(&self.program)
            .arg("index.js")
            .current_dir(artifact_dir)
            .env("PORT", port.to_string())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SupervisionError::Spawn {
                artifact: artifact_dir.to_path_buf(),
                source: e,
            })?;

        let Some(pid) = child.id() else {
            // Exited before we could even read the pid
            let status = child
                .wait()
                .await
                .map_err(|e| SupervisionError::Wait { pid: 0, source: e })?;
            return Err(SupervisionError::EarlyExit {
                code: status.code().unwrap_or(-1),
            });
        };

        self.children.lock().await.insert(pid, child);
        Ok(pid)
    }

    async fn signal_terminate(&self, pid: u32) -> Result<(), SupervisionError> {
        #[cfg(unix)]
        {
            // SAFETY: plain kill(2) with a pid we spawned ourselves.
            let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
            if rc != 0 {
                return Err(SupervisionError::Signal {
                    pid,
                    source: std::io::Error::last_os_error(),
                });
            }
            Ok(())
        }
        #[cfg(not(unix))]
        {
            // No graceful signal available; fall through to the kill path.
            self.force_kill(pid).await
        }
    }

    async fn force_kill(&self, pid: u32) -> Result<(), SupervisionError> {
        let mut children = self.children.lock().await;
        if let Some(child) = children.get_mut(&pid) {
            child
                .start_kill()
                .map_err(|e| SupervisionError::Signal { pid, source: e })?;
        }
        Ok(())
    }

    async fn wait_exit(&self, pid: u32) -> Result<i32, SupervisionError> {
        // Polled rather than awaiting `Child::wait` so that cancellation
        // (the caller's stop timeout) leaves the child in the map, still
        // reachable by `force_kill` and a later wait.
        loop {
            {
                let mut children = self.children.lock().await;
                let Some(child) = children.get_mut(&pid) else {
                    return Ok(0);
                };
                match child.try_wait() {
                    Ok(Some(status)) => {
                        children.remove(&pid);
                        return Ok(status.code().unwrap_or(-1));
                    }
                    Ok(None) => {}
                    Err(e) => return Err(SupervisionError::Wait { pid, source: e }),
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    async fn try_wait(&self, pid: u32) -> Result<Option<i32>, SupervisionError> {
        let mut children = self.children.lock().await;
        let Some(child) = children.get_mut(&pid) else {
            return Ok(Some(0));
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                children.remove(&pid);
                Ok(Some(status.code().unwrap_or(-1)))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(SupervisionError::Wait { pid, source: e }),
        }
    }

    fn port_free(&self, port: u16) -> bool {
        std::net::TcpListener::bind(("127.0.0.1", port)).is_ok()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SupervisionError {
    #[error("failed to spawn process from {artifact}")]
    Spawn {
        artifact: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("process exited with code {code} before startup completed")]
    EarlyExit { code: i32 },

    #[error("failed to signal process {pid}")]
    Signal { pid: u32, source: std::io::Error },

    #[error("failed to wait on process {pid}")]
    Wait { pid: u32, source: std::io::Error },

    #[error("process {pid} did not exit within the stop timeout")]
    StopTimeout { pid: u32 },

    #[error("port {port} was not released by the previous process")]
    PortConflict { port: u16 },
}
