use std::path::Path;

use crate::cli::CliError;
use crate::executor::{CommandExecutor, RealExecutor};

/// Docker operations client, parameterized over the executor for
/// testability.
pub struct DockerClient<E: CommandExecutor = RealExecutor> {
    executor: E,
}

impl DockerClient<RealExecutor> {
    pub fn new() -> Self {
        Self {
            executor: RealExecutor,
        }
    }
}

impl Default for DockerClient<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: CommandExecutor> DockerClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    /// Verify the docker daemon is reachable before any image work.
    pub async fn check_daemon(&self) -> Result<(), DockerError> {
        self.executor
            .exec("docker", &args(["info", "--format", "{{.ServerVersion}}"]))
            .await
            .map(|_| ())
            .map_err(|e| DockerError::DaemonUnavailable { source: e })
    }

    /// Build a local image from the given context directory.
    pub async fn build_image(&self, context_dir: &Path, tag: &str) -> Result<(), DockerError> {
        let context = context_dir
            .to_str()
            .ok_or_else(|| DockerError::InvalidPath(context_dir.to_path_buf()))?;

        tracing::info!(tag, context, "building container image");
        self.executor
            .exec_streaming("docker", &args(["build", "-t", tag, context]))
            .await
            .map_err(|e| DockerError::Build { source: e })
    }

    pub async fn tag_image(&self, local_tag: &str, remote_tag: &str) -> Result<(), DockerError> {
        self.executor
            .exec("docker", &args(["tag", local_tag, remote_tag]))
            .await
            .map(|_| ())
            .map_err(|e| DockerError::Tag { source: e })
    }

    pub async fn push_image(&self, remote_tag: &str) -> Result<(), DockerError> {
        tracing::info!(tag = remote_tag, "pushing image");
        self.executor
            .exec_streaming("docker", &args(["push", remote_tag]))
            .await
            .map_err(|e| DockerError::Push { source: e })
    }

    /// Authenticate against a registry with a password piped to stdin.
    pub async fn login(&self, registry_host: &str, password: &str) -> Result<(), DockerError> {
        self.executor
            .exec_with_stdin(
                "docker",
                &args([
                    "login",
                    "--username",
                    "AWS",
                    "--password-stdin",
                    registry_host,
                ]),
                password.as_bytes(),
            )
            .await
            .map(|_| ())
            .map_err(|e| DockerError::Login { source: e })
    }

    /// Run a locally built image in the foreground, mapping the service
    /// port to the host.
    pub async fn run_container(&self, tag: &str, port: u16) -> Result<(), DockerError> {
        let mapping = format!("{port}:{port}");
        self.executor
            .exec_streaming("docker", &args(["run", "--rm", "-p", &mapping, tag]))
            .await
            .map_err(|e| DockerError::Run { source: e })
    }
}

fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum DockerError {
    #[error("docker daemon is not running — start Docker and retry")]
    DaemonUnavailable { source: CliError },

    #[error("build context path is not valid UTF-8: {0}")]
    InvalidPath(std::path::PathBuf),

    #[error("image build failed")]
    Build { source: CliError },

    #[error("image tag failed")]
    Tag { source: CliError },

    #[error("image push failed")]
    Push { source: CliError },

    #[error("registry login failed")]
    Login { source: CliError },

    #[error("container run failed")]
    Run { source: CliError },
}
