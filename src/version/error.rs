use crate::net::FetchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VersionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Invalid regex {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid glob {pattern:?}: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("No version found in {url} using {regex:?}")]
    NoVersionMatch { url: String, regex: String },

    #[error("Invalid repository {0:?}, expected owner/repo")]
    InvalidRepository(String),

    #[error("No matching release in {repo}: {matcher}")]
    NoMatchingRelease { repo: String, matcher: String },

    #[error("Could not parse version in {repo}: {tag:?}")]
    UnparsableTag { repo: String, tag: String },
}

pub type Result<T> = std::result::Result<T, VersionError>;
