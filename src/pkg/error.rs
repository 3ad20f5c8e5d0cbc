use crate::runner::RunnerError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PkgError {
    #[error("Invalid FreeBSD version: {0:?}")]
    InvalidRelease(String),

    #[error("No packages to install")]
    NoPackages,

    #[error("Could not write {path}: {source}")]
    WriteRepos {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not read hints file {path}: {source}")]
    ReadHints {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not create library directory {path}: {source}")]
    CreateLibraryDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Runner(#[from] RunnerError),
}

pub type Result<T> = std::result::Result<T, PkgError>;
