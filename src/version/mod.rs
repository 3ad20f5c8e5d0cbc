//! Version resolution for assets and GitHub releases

pub mod error;
pub mod release;

pub use error::{Result, VersionError};
pub use release::{GithubReleases, Release, ReleaseFile, ReleaseRef, ReleaseResolver, TagMatcher};

use crate::net::Fetcher;
use crate::types::ContainerInfo;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Version of an asset, either spelled out or scraped from a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VersionConfig {
    Literal(String),
    Url(UrlVersion),
}

/// A version read from the body of `url`.
///
/// Without `regex` the whole body is the version. With it, the first match
/// provides the version through its `version` capture group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UrlVersion {
    pub url: String,
    #[serde(default)]
    pub regex: Option<String>,
}

impl VersionConfig {
    pub fn literal(version: impl Into<String>) -> Self {
        VersionConfig::Literal(version.into())
    }

    /// Check that an embedded regex compiles
    pub fn validate(&self) -> Result<()> {
        match self {
            VersionConfig::Url(UrlVersion {
                regex: Some(pattern),
                ..
            }) => compile(pattern).map(|_| ()),
            _ => Ok(()),
        }
    }

    pub async fn resolve(&self, info: &ContainerInfo, fetcher: &dyn Fetcher) -> Result<String> {
        match self {
            VersionConfig::Literal(version) => Ok(info.apply(version)),
            VersionConfig::Url(url_version) => url_version.resolve(info, fetcher).await,
        }
    }
}

impl UrlVersion {
    pub async fn resolve(&self, info: &ContainerInfo, fetcher: &dyn Fetcher) -> Result<String> {
        let url = info.apply(&self.url);
        let body = fetcher.get(&url).await?;
        let body = String::from_utf8_lossy(&body);

        let version = match &self.regex {
            None => strip_prefix(body.trim()).to_string(),
            Some(pattern) => {
                let regex = compile(pattern)?;
                regex
                    .captures(&body)
                    .map(|captures| match captures.name("version") {
                        Some(version) => version.as_str().to_string(),
                        None => strip_prefix(&captures[0]).to_string(),
                    })
                    .ok_or_else(|| VersionError::NoVersionMatch {
                        url: url.clone(),
                        regex: pattern.clone(),
                    })?
            }
        };

        debug!("Resolved version {version} from {url}");
        Ok(version)
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| VersionError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

/// Drop leading `v`s from a tag such as `v1.2.3`
pub fn strip_prefix(tag: &str) -> &str {
    tag.trim_start_matches('v')
}
