use std::path::Path;

use serde::Deserialize;

/// Minimal view of the host project's package.json.
///
/// Used for sanity checks (`caravel init` refuses to run outside a Node
/// project) and as a name fallback when scaffolding caravel.toml.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeProject {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl NodeProject {
    /// Load package.json from the given project directory, if present.
    pub fn load(project_dir: &Path) -> crate::Result<Option<Self>> {
        let path = project_dir.join("package.json");
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path).map_err(|e| crate::Error::PackageJsonRead {
            path: path.clone(),
            source: e,
        })?;
        let project: Self =
            serde_json::from_str(&content).map_err(|e| crate::Error::PackageJsonParse {
                path,
                source: e,
            })?;
        tracing::debug!(name = ?project.name, "discovered package.json");
        Ok(Some(project))
    }
}
