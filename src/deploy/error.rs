use crate::assets::{AssetError, AssetKind};
use crate::config::ConfigError;
use crate::runner::RunnerError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Asset #{index} ({kind}) failed: {source}")]
    Asset {
        index: usize,
        kind: AssetKind,
        #[source]
        source: AssetError,
    },

    #[error("Could not copy overlay {path}: {source}")]
    Overlay {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not set permissions on {path}: {source}")]
    Permissions {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("Deployment task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, DeployError>;
