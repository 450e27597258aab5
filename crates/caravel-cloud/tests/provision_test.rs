use caravel_cloud::cli::CliError;
use caravel_cloud::executor::CommandExecutor;
use caravel_cloud::provision::{Phase, ProvisionError, Provisioner};
use caravel_core::CaravelConfig;
use mockall::mock;

mock! {
    Executor {}

    impl CommandExecutor for Executor {
        async fn exec(&self, program: &str, args: &[String]) -> Result<String, CliError>;
        async fn exec_streaming(&self, program: &str, args: &[String]) -> Result<(), CliError>;
        async fn exec_with_stdin(
            &self,
            program: &str,
            args: &[String],
            stdin_data: &[u8],
        ) -> Result<String, CliError>;
    }
}

fn config() -> CaravelConfig {
    let mut config: CaravelConfig = toml::from_str(r#"name = "shop""#).unwrap();
    config.aws.account_id = Some("123456789012".to_owned());
    config
}

fn repo_missing() -> CliError {
    CliError::CommandFailed {
        program: "aws".to_owned(),
        args: vec![],
        stderr: "An error occurred (RepositoryNotFoundException) ...".to_owned(),
    }
}

#[tokio::test]
async fn setup_provisions_with_the_setup_phase() {
    let mut mock = MockExecutor::new();
    mock.expect_exec_streaming()
        .withf(|program, args| {
            program == "cdk"
                && args.contains(&"deploy".to_owned())
                && args.contains(&"phase=setup".to_owned())
                && args.contains(&"name=shop".to_owned())
        })
        .times(1)
        .returning(|_, _| Ok(()));

    Provisioner::with_executor(mock).setup(&config()).await.unwrap();
}

#[tokio::test]
async fn deploy_before_setup_refuses_without_touching_the_stack() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|program, args| {
            program == "aws" && args.contains(&"describe-repositories".to_owned())
        })
        .returning(|_, _| Err(repo_missing()));
    // cdk must never be invoked
    mock.expect_exec_streaming().times(0);

    let err = Provisioner::with_executor(mock)
        .deploy(&config())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProvisionError::SetupRequired { ref repository } if repository == "shop-server"
    ));
}

#[tokio::test]
async fn deploy_after_setup_provisions_with_the_deploy_phase() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|_, args| args.contains(&"describe-repositories".to_owned()))
        .returning(|_, _| Ok("{\"repositories\": []}".to_owned()));
    mock.expect_exec_streaming()
        .withf(|program, args| {
            program == "cdk"
                && args.contains(&"deploy".to_owned())
                && args.contains(&"phase=deploy".to_owned())
        })
        .times(1)
        .returning(|_, _| Ok(()));

    Provisioner::with_executor(mock).deploy(&config()).await.unwrap();
}

#[tokio::test]
async fn registry_check_failure_is_not_mistaken_for_absence() {
    let mut mock = MockExecutor::new();
    mock.expect_exec().returning(|_, _| {
        Err(CliError::CommandFailed {
            program: "aws".to_owned(),
            args: vec![],
            stderr: "ExpiredTokenException".to_owned(),
        })
    });
    mock.expect_exec_streaming().times(0);

    let err = Provisioner::with_executor(mock)
        .deploy(&config())
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::Registry { .. }));
}

#[tokio::test]
async fn destroy_tears_down_with_the_shared_context() {
    let mut mock = MockExecutor::new();
    mock.expect_exec_streaming()
        .withf(|program, args| {
            program == "cdk"
                && args.contains(&"destroy".to_owned())
                && args.contains(&"--force".to_owned())
                && args.contains(&"name=shop".to_owned())
        })
        .times(1)
        .returning(|_, _| Ok(()));

    Provisioner::with_executor(mock).destroy(&config()).await.unwrap();
}

#[test]
fn phase_names_match_stack_context_values() {
    assert_eq!(Phase::Setup.as_str(), "setup");
    assert_eq!(Phase::Deploy.as_str(), "deploy");
}
