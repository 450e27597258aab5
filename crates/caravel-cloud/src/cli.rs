/// Errors from invoking an external CLI (docker, aws, cdk).
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{program} CLI not found — is it installed and on PATH?")]
    NotFound {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} command failed: {args:?}\n{stderr}")]
    CommandFailed {
        program: String,
        args: Vec<String>,
        stderr: String,
    },

    #[error("{program} output was not valid UTF-8")]
    InvalidUtf8 {
        program: String,
        source: std::string::FromUtf8Error,
    },

    #[error("failed to write to {program} stdin")]
    StdinWrite {
        program: String,
        source: std::io::Error,
    },
}

impl CliError {
    /// stderr of a failed command, if this error carries one.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            CliError::CommandFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}
