use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// caravel.toml configuration.
///
/// The schema is strict: unknown fields are a parse error, and
/// [`CaravelConfig::load`] runs [`CaravelConfig::validate`] before
/// returning. Config is data — it is never evaluated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaravelConfig {
    /// Service name; used for the image, ECR repository, and ECS service.
    pub name: String,
    /// Port the service listens on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Node.js major version for the runtime image.
    #[serde(default = "default_node_version")]
    pub node_version: u32,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub aws: AwsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Bundle entry point, relative to the project directory.
    #[serde(default = "default_entry")]
    pub entry: String,
    /// Modules left external to the bundle (passed through to the bundler).
    #[serde(default)]
    pub externals: Vec<String>,
    /// Bundler plugin names (passed through to the bundler unchanged).
    #[serde(default)]
    pub plugins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwsConfig {
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_profile")]
    pub profile: String,
    /// 12-digit AWS account id. Required for deploy/provision commands.
    pub account_id: Option<String>,
    /// Fargate task CPU units.
    #[serde(default = "default_cpu")]
    pub cpu: u32,
    /// Fargate task memory in MiB.
    #[serde(default = "default_memory")]
    pub memory: u32,
    /// Desired task count for the service.
    #[serde(default = "default_concurrent_executions")]
    pub concurrent_executions: u32,
    pub vpc_id: Option<String>,
    pub domain_name: Option<String>,
    pub zone_name: Option<String>,
    pub hosted_zone_id: Option<String>,
    #[serde(default = "default_health_check_route")]
    pub health_check_route: String,
    pub ssl_certificate_arn: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            entry: default_entry(),
            externals: Vec::new(),
            plugins: Vec::new(),
        }
    }
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            profile: default_profile(),
            account_id: None,
            cpu: default_cpu(),
            memory: default_memory(),
            concurrent_executions: default_concurrent_executions(),
            vpc_id: None,
            domain_name: None,
            zone_name: None,
            hosted_zone_id: None,
            health_check_route: default_health_check_route(),
            ssl_certificate_arn: None,
        }
    }
}

impl CaravelConfig {
    /// Load and validate caravel.toml from the given project directory.
    pub fn load(project_dir: &Path) -> crate::Result<Self> {
        let config_path = project_dir.join("caravel.toml");
        if !config_path.exists() {
            return Err(crate::Error::ConfigMissing { path: config_path });
        }

        let content =
            std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                path: config_path.clone(),
                source: e,
            })?;
        let config: Self = toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
            path: config_path,
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Schema-level validation beyond what serde can express.
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.is_empty()
            || !self
                .name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(crate::Error::ConfigInvalid {
                field: "name",
                reason: "must be non-empty lowercase alphanumeric with dashes".to_owned(),
            });
        }
        if self.port == 0 {
            return Err(crate::Error::ConfigInvalid {
                field: "port",
                reason: "must be non-zero".to_owned(),
            });
        }
        if self.node_version < 18 {
            return Err(crate::Error::ConfigInvalid {
                field: "node_version",
                reason: format!("{} is not a supported Node.js version (>= 18)", self.node_version),
            });
        }
        if self.build.entry.is_empty() {
            return Err(crate::Error::ConfigInvalid {
                field: "build.entry",
                reason: "must be non-empty".to_owned(),
            });
        }
        let entry = Path::new(&self.build.entry);
        let entry = entry.strip_prefix(".").unwrap_or(entry);
        if entry.is_absolute()
            || entry
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(crate::Error::ConfigInvalid {
                field: "build.entry",
                reason: "must be a relative path inside the project".to_owned(),
            });
        }
        if entry.components().count() < 2 {
            return Err(crate::Error::ConfigInvalid {
                field: "build.entry",
                reason: "must live in a source subdirectory (e.g. ./src/index.ts)".to_owned(),
            });
        }
        if let Some(account) = &self.aws.account_id
            && (account.len() != 12 || !account.chars().all(|c| c.is_ascii_digit()))
        {
            return Err(crate::Error::ConfigInvalid {
                field: "aws.account_id",
                reason: "must be a 12-digit account id".to_owned(),
            });
        }
        if self.aws.cpu == 0 || self.aws.memory == 0 {
            return Err(crate::Error::ConfigInvalid {
                field: "aws.cpu",
                reason: "cpu and memory must be non-zero".to_owned(),
            });
        }
        Ok(())
    }

    /// Directory `caravel run` watches for changes: the leading
    /// component of `build.entry` (e.g. `src` for `./src/index.ts`).
    pub fn source_root(&self) -> PathBuf {
        let entry = Path::new(&self.build.entry);
        let entry = entry.strip_prefix(".").unwrap_or(entry);
        match entry.components().next() {
            Some(Component::Normal(dir)) => PathBuf::from(dir),
            _ => PathBuf::from("src"),
        }
    }

    /// ECR repository name for the service image.
    pub fn repository_name(&self) -> String {
        format!("{}-server", self.name)
    }

    /// Registry host for the configured account/region, when account_id is set.
    pub fn registry_host(&self) -> Option<String> {
        self.aws
            .account_id
            .as_deref()
            .map(|account| format!("{account}.dkr.ecr.{}.amazonaws.com", self.aws.region))
    }

    /// Fully-qualified remote image tag, when account_id is set.
    pub fn remote_image_tag(&self) -> Option<String> {
        self.registry_host()
            .map(|host| format!("{host}/{}:latest", self.repository_name()))
    }

    /// S3 bucket holding the hot-reload marker and file set.
    pub fn hot_reload_bucket(&self) -> String {
        format!("{}-hot-reload", self.name)
    }

    /// ECS cluster name created by the Setup provisioning phase.
    pub fn cluster_name(&self) -> String {
        format!("{}-cluster", self.name)
    }

    /// ECS service name created by the Deploy provisioning phase.
    pub fn service_name(&self) -> String {
        format!("{}-service", self.name)
    }
}

fn default_port() -> u16 {
    8080
}

fn default_node_version() -> u32 {
    20
}

fn default_entry() -> String {
    "./src/index.ts".to_owned()
}

fn default_region() -> String {
    "us-west-2".to_owned()
}

fn default_profile() -> String {
    "default".to_owned()
}

fn default_cpu() -> u32 {
    512
}

fn default_memory() -> u32 {
    2048
}

fn default_concurrent_executions() -> u32 {
    1
}

fn default_health_check_route() -> String {
    "/health".to_owned()
}
