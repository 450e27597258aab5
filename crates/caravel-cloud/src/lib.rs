//! AWS-facing side of Caravel: docker/aws/cdk CLI clients, the publish
//! pipeline, the two-phase provisioner, and the S3-backed hot-reload
//! store.
//!
//! Everything shells out through [`CommandExecutor`], so the whole crate
//! is testable with mocks and carries no cloud SDK dependency.

pub mod aws;
pub mod cli;
pub mod docker;
pub mod executor;
pub mod pipeline;
pub mod provision;
pub mod store;

pub use aws::{AwsClient, EcrError, EcsError, S3Error};
pub use cli::CliError;
pub use docker::{DockerClient, DockerError};
pub use executor::{CommandExecutor, RealExecutor};
pub use pipeline::{PublishError, PublishPipeline};
pub use provision::{Phase, ProvisionError, Provisioner};
pub use store::S3RemoteStore;
