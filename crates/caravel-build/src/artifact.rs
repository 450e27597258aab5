use std::path::{Path, PathBuf};

use caravel_core::CaravelConfig;

use crate::bundler::{BundleSpec, Bundler, BundlerError};

/// Name of the artifact directory inside the project.
const ARTIFACT_DIR: &str = "dist";
/// Staging directory the bundler writes into before the swap.
const STAGING_DIR: &str = "dist.tmp";
/// Runtime files copied into the artifact verbatim when present.
const AUX_FILES: &[&str] = &[".env"];

/// Build orchestrator: bundler invocation plus artifact swap discipline.
pub struct ArtifactBuilder<B: Bundler> {
    bundler: B,
}

impl<B: Bundler> ArtifactBuilder<B> {
    pub fn new(bundler: B) -> Self {
        Self { bundler }
    }

    /// Produce a fresh artifact for the configured entry point.
    ///
    /// The previous artifact stays intact until the bundler has succeeded;
    /// only then is it removed and the staging directory renamed into
    /// place. On any failure the staging directory is cleaned up.
    pub fn build(
        &self,
        config: &CaravelConfig,
        project_dir: &Path,
    ) -> Result<PathBuf, BuildError> {
        let artifact_dir = project_dir.join(ARTIFACT_DIR);
        let staging_dir = project_dir.join(STAGING_DIR);

        // Stale staging dir from an interrupted build
        if staging_dir.exists() {
            std::fs::remove_dir_all(&staging_dir).map_err(|e| BuildError::Stage {
                path: staging_dir.clone(),
                source: e,
            })?;
        }
        std::fs::create_dir_all(&staging_dir).map_err(|e| BuildError::Stage {
            path: staging_dir.clone(),
            source: e,
        })?;

        let spec = BundleSpec {
            entry: config.build.entry.clone(),
            externals: config.build.externals.clone(),
            plugins: config.build.plugins.clone(),
            project_dir: project_dir.to_path_buf(),
            out_dir: staging_dir.clone(),
        };

        if let Err(e) = self.bundler.bundle(&spec) {
            let _ = std::fs::remove_dir_all(&staging_dir);
            return Err(BuildError::Bundle { source: e });
        }

        for aux in AUX_FILES {
            let src = project_dir.join(aux);
            if src.exists() {
                std::fs::copy(&src, staging_dir.join(aux)).map_err(|e| BuildError::AuxCopy {
                    path: src.clone(),
                    source: e,
                })?;
            }
        }

        // Swap: the artifact is either fully-previous or fully-current
        if artifact_dir.exists() {
            std::fs::remove_dir_all(&artifact_dir).map_err(|e| BuildError::Swap {
                path: artifact_dir.clone(),
                source: e,
            })?;
        }
        std::fs::rename(&staging_dir, &artifact_dir).map_err(|e| BuildError::Swap {
            path: artifact_dir.clone(),
            source: e,
        })?;

        tracing::info!(artifact = %artifact_dir.display(), "artifact built");
        Ok(artifact_dir)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("bundling failed")]
    Bundle { source: BundlerError },

    #[error("failed to prepare staging directory {path}")]
    Stage {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to copy runtime file {path} into artifact")]
    AuxCopy {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to swap artifact into {path}")]
    Swap {
        path: PathBuf,
        source: std::io::Error,
    },
}
