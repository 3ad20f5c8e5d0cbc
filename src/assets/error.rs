use crate::archive::ArchiveError;
use crate::net::FetchError;
use crate::pkg::PkgError;
use crate::version::VersionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Pkg(#[from] PkgError),

    #[error("Could not write {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid glob {pattern:?}: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Could not find matching asset from release in {repo:?}: {glob:?}")]
    NoMatchingAsset { repo: String, glob: String },
}

pub type Result<T> = std::result::Result<T, AssetError>;
