use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("caravel.toml not found at {path} — run `caravel init` first")]
    ConfigMissing { path: PathBuf },

    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config field `{field}`: {reason}")]
    ConfigInvalid { field: &'static str, reason: String },

    // ── Node project discovery ──
    #[error("failed to read package.json at {path}")]
    PackageJsonRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse package.json at {path}")]
    PackageJsonParse {
        path: PathBuf,
        source: serde_json::Error,
    },
}
