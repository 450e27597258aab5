use std::time::Duration;

use crate::cli::CliError;
use crate::executor::{CommandExecutor, RealExecutor};

/// Attempts made while waiting for a pushed image to become visible.
pub const DEFAULT_IMAGE_WAIT_ATTEMPTS: u32 = 10;

/// Initial backoff between image visibility checks; doubles per attempt.
pub const DEFAULT_IMAGE_WAIT_BACKOFF: Duration = Duration::from_secs(2);

const BACKOFF_CAP: Duration = Duration::from_secs(30);

/// AWS operations client (ECR, ECS, S3), parameterized over the executor
/// for testability. Every call is scoped to one region and profile.
pub struct AwsClient<E: CommandExecutor = RealExecutor> {
    executor: E,
    region: String,
    profile: String,
}

impl AwsClient<RealExecutor> {
    pub fn new(region: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            executor: RealExecutor,
            region: region.into(),
            profile: profile.into(),
        }
    }
}

impl<E: CommandExecutor> AwsClient<E> {
    pub fn with_executor(
        executor: E,
        region: impl Into<String>,
        profile: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            region: region.into(),
            profile: profile.into(),
        }
    }

    fn scoped(&self, base: &[&str]) -> Vec<String> {
        let mut v: Vec<String> = base.iter().map(|s| (*s).to_owned()).collect();
        v.push("--region".to_owned());
        v.push(self.region.clone());
        v.push("--profile".to_owned());
        v.push(self.profile.clone());
        v
    }

    // ── ECR ──

    /// Temporary registry password for `docker login`.
    pub async fn ecr_login_password(&self) -> Result<String, EcrError> {
        let output = self
            .executor
            .exec("aws", &self.scoped(&["ecr", "get-login-password"]))
            .await
            .map_err(|e| EcrError::Credentials { source: e })?;

        Ok(output.trim().to_owned())
    }

    pub async fn repository_exists(&self, repository: &str) -> Result<bool, EcrError> {
        let result = self
            .executor
            .exec(
                "aws",
                &self.scoped(&["ecr", "describe-repositories", "--repository-names", repository]),
            )
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e, "RepositoryNotFoundException") => Ok(false),
            Err(e) => Err(EcrError::Describe {
                repository: repository.to_owned(),
                source: e,
            }),
        }
    }

    /// Whether the `latest` image is visible in the repository yet.
    pub async fn image_available(&self, repository: &str) -> Result<bool, EcrError> {
        let result = self
            .executor
            .exec(
                "aws",
                &self.scoped(&[
                    "ecr",
                    "describe-images",
                    "--repository-name",
                    repository,
                    "--image-ids",
                    "imageTag=latest",
                ]),
            )
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e, "ImageNotFoundException") => Ok(false),
            Err(e) => Err(EcrError::Describe {
                repository: repository.to_owned(),
                source: e,
            }),
        }
    }

    /// Poll until the pushed image is visible, with exponential backoff.
    /// Registry indexing lags the push, so a bounded wait replaces any
    /// guess at a fixed delay.
    pub async fn wait_for_image(
        &self,
        repository: &str,
        attempts: u32,
        initial_backoff: Duration,
    ) -> Result<(), EcrError> {
        let mut backoff = initial_backoff;
        for attempt in 1..=attempts {
            if self.image_available(repository).await? {
                tracing::debug!(repository, attempt, "image visible in registry");
                return Ok(());
            }
            tracing::debug!(repository, attempt, ?backoff, "image not visible yet");
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(BACKOFF_CAP);
        }

        Err(EcrError::ImageTimeout {
            repository: repository.to_owned(),
            attempts,
        })
    }

    // ── ECS ──

    /// Restart all tasks of a service on its current image.
    pub async fn force_new_deployment(
        &self,
        cluster: &str,
        service: &str,
    ) -> Result<(), EcsError> {
        tracing::info!(cluster, service, "forcing new deployment");
        self.executor
            .exec(
                "aws",
                &self.scoped(&[
                    "ecs",
                    "update-service",
                    "--cluster",
                    cluster,
                    "--service",
                    service,
                    "--force-new-deployment",
                ]),
            )
            .await
            .map(|_| ())
            .map_err(|e| EcsError::UpdateService {
                service: service.to_owned(),
                source: e,
            })
    }

    // ── S3 ──

    /// Content of one object, streamed to stdout.
    pub async fn s3_get(&self, bucket: &str, key: &str) -> Result<String, S3Error> {
        let uri = format!("s3://{bucket}/{key}");
        self.executor
            .exec("aws", &self.scoped(&["s3", "cp", &uri, "-"]))
            .await
            .map_err(|e| S3Error::Get {
                key: key.to_owned(),
                source: e,
            })
    }

    /// All keys in a bucket. An empty bucket yields an empty list.
    pub async fn s3_list_keys(&self, bucket: &str) -> Result<Vec<String>, S3Error> {
        let output = self
            .executor
            .exec(
                "aws",
                &self.scoped(&[
                    "s3api",
                    "list-objects-v2",
                    "--bucket",
                    bucket,
                    "--query",
                    "Contents[].Key",
                    "--output",
                    "json",
                ]),
            )
            .await
            .map_err(|e| S3Error::List { source: e })?;

        // --query yields the literal `null` when the bucket is empty
        let trimmed = output.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(Vec::new());
        }

        serde_json::from_str(trimmed).map_err(|e| S3Error::Parse { source: e })
    }
}

fn is_not_found(error: &CliError, marker: &str) -> bool {
    error.stderr().is_some_and(|s| s.contains(marker))
}

#[derive(Debug, thiserror::Error)]
pub enum EcrError {
    #[error("failed to obtain registry credentials")]
    Credentials { source: CliError },

    #[error("failed to describe repository {repository}")]
    Describe { repository: String, source: CliError },

    #[error("image did not appear in repository {repository} after {attempts} checks")]
    ImageTimeout { repository: String, attempts: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    #[error("failed to restart service {service}")]
    UpdateService { service: String, source: CliError },
}

#[derive(Debug, thiserror::Error)]
pub enum S3Error {
    #[error("failed to fetch object {key}")]
    Get { key: String, source: CliError },

    #[error("failed to list bucket contents")]
    List { source: CliError },

    #[error("unexpected key listing format")]
    Parse { source: serde_json::Error },
}
