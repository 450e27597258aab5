use std::path::Path;

use caravel_core::CaravelConfig;

use crate::aws::{
    AwsClient, EcrError, EcsError, DEFAULT_IMAGE_WAIT_ATTEMPTS, DEFAULT_IMAGE_WAIT_BACKOFF,
};
use crate::docker::{DockerClient, DockerError};
use crate::executor::{CommandExecutor, RealExecutor};

/// Publish pipeline: containerize the built artifact, push it to the
/// registry, and restart the remote service onto it.
///
/// Stages run strictly in order and the pipeline stops at the first
/// failure; each error names the stage that produced it.
pub struct PublishPipeline<E: CommandExecutor = RealExecutor> {
    docker: DockerClient<E>,
    aws: AwsClient<E>,
}

impl PublishPipeline<RealExecutor> {
    pub fn new(config: &CaravelConfig) -> Self {
        Self {
            docker: DockerClient::new(),
            aws: AwsClient::new(&config.aws.region, &config.aws.profile),
        }
    }
}

impl<E: CommandExecutor> PublishPipeline<E> {
    pub fn with_clients(docker: DockerClient<E>, aws: AwsClient<E>) -> Self {
        Self { docker, aws }
    }

    /// Run the full pipeline against a prepared build context (artifact
    /// plus Dockerfile). Returns the remote tag the service now runs.
    pub async fn publish(
        &self,
        context_dir: &Path,
        config: &CaravelConfig,
    ) -> Result<String, PublishError> {
        let registry_host = config.registry_host().ok_or(PublishError::MissingAccountId)?;
        let remote_tag = config
            .remote_image_tag()
            .ok_or(PublishError::MissingAccountId)?;
        let repository = config.repository_name();

        self.docker
            .check_daemon()
            .await
            .map_err(|e| PublishError::Containerize { source: e })?;
        self.docker
            .build_image(context_dir, &repository)
            .await
            .map_err(|e| PublishError::Containerize { source: e })?;

        let password = self
            .aws
            .ecr_login_password()
            .await
            .map_err(|e| PublishError::Credentials { source: e })?;
        self.docker
            .login(&registry_host, &password)
            .await
            .map_err(|e| PublishError::Auth { source: e })?;

        self.docker
            .tag_image(&repository, &remote_tag)
            .await
            .map_err(|e| PublishError::Tag { source: e })?;
        self.docker
            .push_image(&remote_tag)
            .await
            .map_err(|e| PublishError::Push { source: e })?;

        // The registry indexes the push asynchronously; restarting the
        // service before the image is visible would roll it onto nothing
        self.aws
            .wait_for_image(
                &repository,
                DEFAULT_IMAGE_WAIT_ATTEMPTS,
                DEFAULT_IMAGE_WAIT_BACKOFF,
            )
            .await
            .map_err(|e| PublishError::Verify { source: e })?;

        self.aws
            .force_new_deployment(&config.cluster_name(), &config.service_name())
            .await
            .map_err(|e| PublishError::Restart { source: e })?;

        tracing::info!(tag = %remote_tag, "service restarted onto new image");
        Ok(remote_tag)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("aws.account_id must be set in caravel.toml to publish")]
    MissingAccountId,

    #[error("containerize stage failed")]
    Containerize { source: DockerError },

    #[error("credential stage failed")]
    Credentials { source: EcrError },

    #[error("registry auth stage failed")]
    Auth { source: DockerError },

    #[error("tag stage failed")]
    Tag { source: DockerError },

    #[error("push stage failed")]
    Push { source: DockerError },

    #[error("image verification stage failed")]
    Verify { source: EcrError },

    #[error("service restart stage failed")]
    Restart { source: EcsError },
}
