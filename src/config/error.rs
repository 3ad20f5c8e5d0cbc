use crate::archive::ArchiveError;
use crate::version::VersionError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid user {0:?}, expected name or name=uid")]
    InvalidUser(String),

    #[error("Invalid file mapping: {0}")]
    Mapping(#[from] ArchiveError),

    #[error("Invalid version: {0}")]
    Version(#[from] VersionError),

    #[error("Container has no assets")]
    NoAssets,
}

pub type Result<T> = std::result::Result<T, ConfigError>;
