use caravel_core::CaravelConfig;

use crate::cli::CliError;
use crate::executor::{CommandExecutor, RealExecutor};

/// Provisioning phase. Setup creates the container registry; Deploy
/// creates the compute service around an image that must already be in
/// that registry. The service cannot exist before the repository does,
/// which is why the phases are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Deploy,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::Deploy => "deploy",
        }
    }
}

/// Drives the infrastructure stack through its two phases via the cdk
/// CLI, with a registry existence check gating the Deploy phase.
pub struct Provisioner<E: CommandExecutor = RealExecutor> {
    executor: E,
}

impl Provisioner<RealExecutor> {
    pub fn new() -> Self {
        Self {
            executor: RealExecutor,
        }
    }
}

impl Default for Provisioner<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: CommandExecutor> Provisioner<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    /// Phase one: create the registry (and the other image-independent
    /// resources).
    pub async fn setup(&self, config: &CaravelConfig) -> Result<(), ProvisionError> {
        tracing::info!(name = %config.name, "provisioning setup phase");
        self.executor
            .exec_streaming("cdk", &deploy_args(config, Phase::Setup))
            .await
            .map_err(|e| ProvisionError::Provision {
                phase: Phase::Setup,
                source: e,
            })
    }

    /// Phase two: create the compute service. Refuses to run — without
    /// touching any infrastructure — when the registry from phase one is
    /// missing, since the service would have no image to start from.
    pub async fn deploy(&self, config: &CaravelConfig) -> Result<(), ProvisionError> {
        let repository = config.repository_name();
        if !self.registry_exists(config, &repository).await? {
            return Err(ProvisionError::SetupRequired { repository });
        }

        tracing::info!(name = %config.name, "provisioning deploy phase");
        self.executor
            .exec_streaming("cdk", &deploy_args(config, Phase::Deploy))
            .await
            .map_err(|e| ProvisionError::Provision {
                phase: Phase::Deploy,
                source: e,
            })
    }

    /// Tear down the whole stack.
    pub async fn destroy(&self, config: &CaravelConfig) -> Result<(), ProvisionError> {
        tracing::info!(name = %config.name, "destroying stack");
        let mut args = vec!["destroy".to_owned(), "--all".to_owned(), "--force".to_owned()];
        args.extend(context_args(config, Phase::Deploy));
        self.executor
            .exec_streaming("cdk", &args)
            .await
            .map_err(|e| ProvisionError::Destroy { source: e })
    }

    async fn registry_exists(
        &self,
        config: &CaravelConfig,
        repository: &str,
    ) -> Result<bool, ProvisionError> {
        let args: Vec<String> = [
            "ecr",
            "describe-repositories",
            "--repository-names",
            repository,
            "--region",
            &config.aws.region,
            "--profile",
            &config.aws.profile,
        ]
        .iter()
        .map(|s| (*s).to_owned())
        .collect();

        match self.executor.exec("aws", &args).await {
            Ok(_) => Ok(true),
            Err(e)
                if e.stderr()
                    .is_some_and(|s| s.contains("RepositoryNotFoundException")) =>
            {
                Ok(false)
            }
            Err(e) => Err(ProvisionError::Registry { source: e }),
        }
    }
}

fn deploy_args(config: &CaravelConfig, phase: Phase) -> Vec<String> {
    let mut args = vec![
        "deploy".to_owned(),
        "--all".to_owned(),
        "--require-approval".to_owned(),
        "never".to_owned(),
    ];
    args.extend(context_args(config, phase));
    args
}

/// Stack context passed as `-c key=value` pairs. Both phases receive the
/// identical context so the stack synthesizes consistently; only the
/// phase key differs.
fn context_args(config: &CaravelConfig, phase: Phase) -> Vec<String> {
    let mut pairs: Vec<(String, String)> = vec![
        ("phase".to_owned(), phase.as_str().to_owned()),
        ("name".to_owned(), config.name.clone()),
        ("port".to_owned(), config.port.to_string()),
        ("cpu".to_owned(), config.aws.cpu.to_string()),
        ("memory".to_owned(), config.aws.memory.to_string()),
        ("region".to_owned(), config.aws.region.clone()),
        (
            "concurrentExecutions".to_owned(),
            config.aws.concurrent_executions.to_string(),
        ),
        (
            "healthCheckRoute".to_owned(),
            config.aws.health_check_route.clone(),
        ),
    ];

    let optional = [
        ("accountId", config.aws.account_id.as_deref()),
        ("vpcId", config.aws.vpc_id.as_deref()),
        ("domainName", config.aws.domain_name.as_deref()),
        ("zoneName", config.aws.zone_name.as_deref()),
        ("hostedZoneID", config.aws.hosted_zone_id.as_deref()),
        (
            "sslCertificateARN",
            config.aws.ssl_certificate_arn.as_deref(),
        ),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            pairs.push((key.to_owned(), value.to_owned()));
        }
    }

    let mut args = Vec::with_capacity(pairs.len() * 2);
    for (key, value) in pairs {
        args.push("-c".to_owned());
        args.push(format!("{key}={value}"));
    }
    args
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("registry {repository} does not exist — run setup first")]
    SetupRequired { repository: String },

    #[error("failed to check registry state")]
    Registry { source: CliError },

    #[error("{} phase provisioning failed", .phase.as_str())]
    Provision { phase: Phase, source: CliError },

    #[error("stack destroy failed")]
    Destroy { source: CliError },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CaravelConfig {
        let mut config: CaravelConfig = toml::from_str(r#"name = "shop""#).unwrap();
        config.aws.account_id = Some("123456789012".to_owned());
        config.aws.domain_name = Some("shop.example.com".to_owned());
        config
    }

    #[test]
    fn context_includes_phase_and_required_keys() {
        let args = context_args(&config(), Phase::Setup);
        assert!(args.contains(&"phase=setup".to_owned()));
        assert!(args.contains(&"name=shop".to_owned()));
        assert!(args.contains(&"port=8080".to_owned()));
        assert!(args.contains(&"accountId=123456789012".to_owned()));
        assert!(args.contains(&"domainName=shop.example.com".to_owned()));
    }

    #[test]
    fn unset_optional_keys_are_omitted() {
        let args = context_args(&config(), Phase::Deploy);
        assert!(args.contains(&"phase=deploy".to_owned()));
        assert!(!args.iter().any(|a| a.starts_with("vpcId=")));
        assert!(!args.iter().any(|a| a.starts_with("sslCertificateARN=")));
    }

    #[test]
    fn phases_share_identical_context_apart_from_phase() {
        let setup: Vec<_> = context_args(&config(), Phase::Setup)
            .into_iter()
            .filter(|a| !a.starts_with("phase="))
            .collect();
        let deploy: Vec<_> = context_args(&config(), Phase::Deploy)
            .into_iter()
            .filter(|a| !a.starts_with("phase="))
            .collect();
        assert_eq!(setup, deploy);
    }
}
