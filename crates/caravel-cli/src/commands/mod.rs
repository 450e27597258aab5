mod agent;
mod deploy;
mod destroy_aws;
mod init;
mod new;
mod run;
mod setup_aws;

pub use agent::agent;
pub use deploy::deploy;
pub use destroy_aws::destroy_aws;
pub use init::init_project;
pub use new::new_project;
pub use run::run;
pub use setup_aws::{deploy_aws, setup_aws};

/// caravel.toml scaffolded by `new` and `init`.
pub(crate) fn caravel_toml_template(name: &str) -> String {
    format!(
        r#"name = "{name}"
# port = 8080
# node_version = 20

[build]
# entry = "./src/index.ts"
# externals = []

[aws]
# region = "us-west-2"
# profile = "default"
# account_id = "123456789012"
# cpu = 512
# memory = 2048
"#
    )
}
