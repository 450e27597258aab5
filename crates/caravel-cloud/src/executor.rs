use crate::cli::CliError;

/// Abstraction over external CLI execution (docker, aws, cdk) for
/// testability.
///
/// Production code uses [`RealExecutor`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait CommandExecutor: Send + Sync {
    /// Execute a command and capture stdout.
    async fn exec(&self, program: &str, args: &[String]) -> Result<String, CliError>;

    /// Execute a command, streaming output to the terminal.
    async fn exec_streaming(&self, program: &str, args: &[String]) -> Result<(), CliError>;

    /// Execute a command with data piped to stdin.
    async fn exec_with_stdin(
        &self,
        program: &str,
        args: &[String],
        stdin_data: &[u8],
    ) -> Result<String, CliError>;
}

/// Real subprocess executor.
pub struct RealExecutor;

impl CommandExecutor for RealExecutor {
    async fn exec(&self, program: &str, args: &[String]) -> Result<String, CliError> {
        use std::process::Stdio;

        let output = tokio::process::Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| CliError::NotFound {
                program: program.to_owned(),
                source: e,
            })?;

        if output.status.success() {
            String::from_utf8(output.stdout).map_err(|e| CliError::InvalidUtf8 {
                program: program.to_owned(),
                source: e,
            })
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            Err(CliError::CommandFailed {
                program: program.to_owned(),
                args: args.to_vec(),
                stderr,
            })
        }
    }

    async fn exec_streaming(&self, program: &str, args: &[String]) -> Result<(), CliError> {
        use std::process::Stdio;

        let status = tokio::process::Command::new(program)
            .args(args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| CliError::NotFound {
                program: program.to_owned(),
                source: e,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(CliError::CommandFailed {
                program: program.to_owned(),
                args: args.to_vec(),
                stderr: format!("exit code: {status}"),
            })
        }
    }

    async fn exec_with_stdin(
        &self,
        program: &str,
        args: &[String],
        stdin_data: &[u8],
    ) -> Result<String, CliError> {
        use std::process::Stdio;
        use tokio::io::AsyncWriteExt;

        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CliError::NotFound {
                program: program.to_owned(),
                source: e,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(stdin_data)
                .await
                .map_err(|e| CliError::StdinWrite {
                    program: program.to_owned(),
                    source: e,
                })?;
            stdin
                .shutdown()
                .await
                .map_err(|e| CliError::StdinWrite {
                    program: program.to_owned(),
                    source: e,
                })?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| CliError::NotFound {
                program: program.to_owned(),
                source: e,
            })?;

        if output.status.success() {
            String::from_utf8(output.stdout).map_err(|e| CliError::InvalidUtf8 {
                program: program.to_owned(),
                source: e,
            })
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            Err(CliError::CommandFailed {
                program: program.to_owned(),
                args: args.to_vec(),
                stderr,
            })
        }
    }
}
