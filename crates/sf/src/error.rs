//! CLI error types.

use sf_config::ConfigError;
use sf_site::SiteError;
use sf_source::SourceError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Build failed: {0}")]
    Build(#[from] SiteError),

    #[error("{0}")]
    Source(#[from] SourceError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Server(String),
}
