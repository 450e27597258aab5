use caravel_core::{CaravelConfig, Error, NodeProject};
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) {
    std::fs::write(dir.path().join("caravel.toml"), content).unwrap();
}

#[test]
fn load_minimal_config_fills_defaults() {
    let tmp = TempDir::new().unwrap();
    write_config(&tmp, "name = \"memoizer\"");

    let config = CaravelConfig::load(tmp.path()).unwrap();

    assert_eq!(config.name, "memoizer");
    assert_eq!(config.port, 8080);
    assert_eq!(config.node_version, 20);
    assert_eq!(config.build.entry, "./src/index.ts");
    assert!(config.build.externals.is_empty());
    assert!(config.build.plugins.is_empty());
    assert_eq!(config.aws.region, "us-west-2");
    assert_eq!(config.aws.profile, "default");
    assert_eq!(config.aws.cpu, 512);
    assert_eq!(config.aws.memory, 2048);
    assert_eq!(config.aws.concurrent_executions, 1);
    assert_eq!(config.aws.health_check_route, "/health");
    assert!(config.aws.account_id.is_none());
}

#[test]
fn load_full_config() {
    let tmp = TempDir::new().unwrap();
    write_config(
        &tmp,
        r#"
name = "my-api"
port = 3000
node_version = 22

[build]
entry = "./src/server.ts"
externals = ["prettier", "esbuild"]
plugins = ["graphql-loader"]

[aws]
region = "eu-west-1"
profile = "staging"
account_id = "123456789012"
cpu = 1024
memory = 4096
concurrent_executions = 3
vpc_id = "vpc-0abc"
domain_name = "api.example.com"
zone_name = "example.com"
hosted_zone_id = "Z0123456"
health_check_route = "/healthz"
ssl_certificate_arn = "arn:aws:acm:us-east-1:123456789012:certificate/abc"
"#,
    );

    let config = CaravelConfig::load(tmp.path()).unwrap();

    assert_eq!(config.name, "my-api");
    assert_eq!(config.port, 3000);
    assert_eq!(config.node_version, 22);
    assert_eq!(config.build.entry, "./src/server.ts");
    assert_eq!(config.build.externals, vec!["prettier", "esbuild"]);
    assert_eq!(config.build.plugins, vec!["graphql-loader"]);
    assert_eq!(config.aws.region, "eu-west-1");
    assert_eq!(config.aws.account_id.as_deref(), Some("123456789012"));
    assert_eq!(config.aws.cpu, 1024);
    assert_eq!(config.aws.domain_name.as_deref(), Some("api.example.com"));
    assert_eq!(config.aws.health_check_route, "/healthz");
}

#[test]
fn load_missing_config_is_distinct_error() {
    let tmp = TempDir::new().unwrap();

    let err = CaravelConfig::load(tmp.path()).unwrap_err();
    assert!(matches!(err, Error::ConfigMissing { .. }));
    assert!(err.to_string().contains("caravel init"));
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let tmp = TempDir::new().unwrap();
    write_config(&tmp, "not valid {{{{ toml");

    let err = CaravelConfig::load(tmp.path()).unwrap_err();
    assert!(matches!(err, Error::ConfigParse { .. }));
}

#[test]
fn unknown_fields_are_rejected() {
    let tmp = TempDir::new().unwrap();
    write_config(
        &tmp,
        r#"
name = "svc"
eval_me = "require('fs')"
"#,
    );

    let err = CaravelConfig::load(tmp.path()).unwrap_err();
    assert!(matches!(err, Error::ConfigParse { .. }));
}

#[test]
fn unknown_nested_fields_are_rejected() {
    let tmp = TempDir::new().unwrap();
    write_config(
        &tmp,
        r#"
name = "svc"

[build]
esbuild_hook = "script.js"
"#,
    );

    assert!(CaravelConfig::load(tmp.path()).is_err());
}

#[test]
fn validate_rejects_bad_name() {
    let tmp = TempDir::new().unwrap();
    write_config(&tmp, "name = \"My Service!\"");

    let err = CaravelConfig::load(tmp.path()).unwrap_err();
    assert!(matches!(err, Error::ConfigInvalid { field: "name", .. }));
}

#[test]
fn validate_rejects_zero_port() {
    let tmp = TempDir::new().unwrap();
    write_config(&tmp, "name = \"svc\"\nport = 0");

    let err = CaravelConfig::load(tmp.path()).unwrap_err();
    assert!(matches!(err, Error::ConfigInvalid { field: "port", .. }));
}

#[test]
fn validate_rejects_old_node() {
    let tmp = TempDir::new().unwrap();
    write_config(&tmp, "name = \"svc\"\nnode_version = 14");

    let err = CaravelConfig::load(tmp.path()).unwrap_err();
    assert!(matches!(
        err,
        Error::ConfigInvalid {
            field: "node_version",
            ..
        }
    ));
}

#[test]
fn validate_rejects_entry_escaping_the_project() {
    let tmp = TempDir::new().unwrap();
    write_config(
        &tmp,
        r#"
name = "svc"

[build]
entry = "../outside/main.ts"
"#,
    );

    let err = CaravelConfig::load(tmp.path()).unwrap_err();
    assert!(matches!(
        err,
        Error::ConfigInvalid {
            field: "build.entry",
            ..
        }
    ));

    write_config(&tmp, "name = \"svc\"\n\n[build]\nentry = \"/tmp/main.ts\"");
    let err = CaravelConfig::load(tmp.path()).unwrap_err();
    assert!(matches!(
        err,
        Error::ConfigInvalid {
            field: "build.entry",
            ..
        }
    ));
}

#[test]
fn validate_rejects_entry_outside_a_source_directory() {
    let tmp = TempDir::new().unwrap();
    write_config(&tmp, "name = \"svc\"\n\n[build]\nentry = \"./index.ts\"");

    let err = CaravelConfig::load(tmp.path()).unwrap_err();
    assert!(matches!(
        err,
        Error::ConfigInvalid {
            field: "build.entry",
            ..
        }
    ));
}

#[test]
fn validate_rejects_malformed_account_id() {
    let tmp = TempDir::new().unwrap();
    write_config(
        &tmp,
        r#"
name = "svc"

[aws]
account_id = "12345"
"#,
    );

    let err = CaravelConfig::load(tmp.path()).unwrap_err();
    assert!(matches!(
        err,
        Error::ConfigInvalid {
            field: "aws.account_id",
            ..
        }
    ));
}

// ── Derived names ──

#[test]
fn derived_resource_names() {
    let tmp = TempDir::new().unwrap();
    write_config(
        &tmp,
        r#"
name = "memoizer"

[aws]
account_id = "123456789012"
region = "us-west-2"
"#,
    );

    let config = CaravelConfig::load(tmp.path()).unwrap();

    assert_eq!(config.repository_name(), "memoizer-server");
    assert_eq!(config.hot_reload_bucket(), "memoizer-hot-reload");
    assert_eq!(config.cluster_name(), "memoizer-cluster");
    assert_eq!(
        config.registry_host().unwrap(),
        "123456789012.dkr.ecr.us-west-2.amazonaws.com"
    );
    assert_eq!(
        config.remote_image_tag().unwrap(),
        "123456789012.dkr.ecr.us-west-2.amazonaws.com/memoizer-server:latest"
    );
}

#[test]
fn source_root_follows_the_entry_directory() {
    let tmp = TempDir::new().unwrap();
    write_config(&tmp, "name = \"svc\"\n\n[build]\nentry = \"./server/main.ts\"");
    let config = CaravelConfig::load(tmp.path()).unwrap();
    assert_eq!(config.source_root(), std::path::PathBuf::from("server"));

    write_config(&tmp, "name = \"svc\"");
    let config = CaravelConfig::load(tmp.path()).unwrap();
    assert_eq!(config.source_root(), std::path::PathBuf::from("src"));
}

#[test]
fn registry_host_requires_account_id() {
    let tmp = TempDir::new().unwrap();
    write_config(&tmp, "name = \"svc\"");

    let config = CaravelConfig::load(tmp.path()).unwrap();
    assert!(config.registry_host().is_none());
    assert!(config.remote_image_tag().is_none());
}

// ── package.json discovery ──

#[test]
fn node_project_loads_name_and_version() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("package.json"),
        r#"{"name": "memoizer", "version": "1.2.3", "dependencies": {}}"#,
    )
    .unwrap();

    let project = NodeProject::load(tmp.path()).unwrap().unwrap();
    assert_eq!(project.name.as_deref(), Some("memoizer"));
    assert_eq!(project.version.as_deref(), Some("1.2.3"));
}

#[test]
fn node_project_absent_is_none() {
    let tmp = TempDir::new().unwrap();
    assert!(NodeProject::load(tmp.path()).unwrap().is_none());
}

#[test]
fn node_project_malformed_is_error() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("package.json"), "{not json").unwrap();

    assert!(matches!(
        NodeProject::load(tmp.path()),
        Err(Error::PackageJsonParse { .. })
    ));
}

// ── Property: name validation ──

mod name_properties {
    use super::*;
    use proptest::prelude::*;

    fn config_with_name(name: &str) -> CaravelConfig {
        toml::from_str(&format!("name = {name:?}")).unwrap()
    }

    proptest! {
        #[test]
        fn lowercase_dashed_names_validate(name in "[a-z][a-z0-9-]{0,30}") {
            prop_assert!(config_with_name(&name).validate().is_ok());
        }

        #[test]
        fn names_with_uppercase_or_space_fail(name in "[a-z]{0,5}[A-Z ][a-z]{0,5}") {
            prop_assert!(config_with_name(&name).validate().is_err());
        }
    }
}
