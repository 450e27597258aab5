use std::path::PathBuf;
use std::process::Command;

/// One bundler invocation: entry point in, bundled tree out.
#[derive(Debug, Clone)]
pub struct BundleSpec {
    /// Entry point, relative to `project_dir`.
    pub entry: String,
    /// Modules kept external to the bundle.
    pub externals: Vec<String>,
    /// Plugin names, forwarded to the bundler unchanged.
    pub plugins: Vec<String>,
    pub project_dir: PathBuf,
    /// Directory the bundler writes into.
    pub out_dir: PathBuf,
}

/// Bundler collaborator contract.
///
/// Production code uses [`EsbuildBundler`]; tests substitute a fake that
/// writes files directly.
pub trait Bundler: Send + Sync {
    fn bundle(&self, spec: &BundleSpec) -> Result<(), BundlerError>;
}

/// Invokes the `esbuild` binary.
pub struct EsbuildBundler {
    program: String,
}

impl EsbuildBundler {
    pub fn new() -> Self {
        Self {
            program: "esbuild".to_owned(),
        }
    }

    /// Override the bundler binary (e.g. a wrapper script that loads plugins).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn build_args(spec: &BundleSpec) -> Vec<String> {
        let mut args = vec![
            spec.entry.clone(),
            "--bundle".to_owned(),
            "--platform=node".to_owned(),
            "--target=es2022".to_owned(),
            "--sourcemap".to_owned(),
            format!("--outdir={}", spec.out_dir.display()),
        ];
        for external in &spec.externals {
            args.push(format!("--external:{external}"));
        }
        // Plugin resolution is the bundler's contract; names pass through as-is.
        for plugin in &spec.plugins {
            args.push(format!("--plugin:{plugin}"));
        }
        args
    }
}

impl Default for EsbuildBundler {
    fn default() -> Self {
        Self::new()
    }
}

impl Bundler for EsbuildBundler {
    fn bundle(&self, spec: &BundleSpec) -> Result<(), BundlerError> {
        let args = Self::build_args(spec);
        tracing::debug!(program = %self.program, ?args, "invoking bundler");

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(&spec.project_dir)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    BundlerError::NotFound {
                        program: self.program.clone(),
                    }
                } else {
                    BundlerError::Io {
                        program: self.program.clone(),
                        source: e,
                    }
                }
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(BundlerError::Failed {
                entry: spec.entry.clone(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            })
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BundlerError {
    #[error("bundler `{program}` not found — install it or add it to PATH")]
    NotFound { program: String },

    #[error("failed to execute bundler `{program}`")]
    Io {
        program: String,
        source: std::io::Error,
    },

    #[error("bundling {entry} failed:\n{stderr}")]
    Failed { entry: String, stderr: String },
}
