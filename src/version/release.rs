//! GitHub release selection

use super::{strip_prefix, Result, VersionError};
use crate::net::{FetchError, USER_AGENT};
use async_trait::async_trait;
use glob::Pattern;
use regex::Regex;
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

pub const GITHUB_API: &str = "https://api.github.com";
const PER_PAGE: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseFile {
    pub name: String,
    pub browser_download_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<ReleaseFile>,
}

/// A repository plus an optional reference matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRef {
    /// `owner/repo`
    pub repo: String,
    pub matcher: Option<String>,
}

impl ReleaseRef {
    pub fn new(repo: impl Into<String>, matcher: Option<String>) -> Self {
        Self {
            repo: repo.into(),
            matcher: matcher.filter(|m| !m.is_empty()),
        }
    }

    pub fn owner_repo(&self) -> Result<(&str, &str)> {
        match self.repo.split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
                Ok((owner, repo))
            }
            _ => Err(VersionError::InvalidRepository(self.repo.clone())),
        }
    }
}

/// How a release tag is selected.
///
/// `/pattern/` is an anchored regex whose `version` group, when present,
/// is the version. A reference containing `*` is a glob. Anything else must
/// equal the tag.
#[derive(Debug, Clone)]
pub enum TagMatcher {
    Exact(String),
    Glob(Pattern),
    Regex(Regex),
}

impl TagMatcher {
    pub fn parse(matcher: &str) -> Result<Self> {
        if matcher.len() >= 2 && matcher.starts_with('/') && matcher.ends_with('/') {
            let pattern = format!("^(?:{})$", &matcher[1..matcher.len() - 1]);
            return Regex::new(&pattern)
                .map(TagMatcher::Regex)
                .map_err(|source| VersionError::InvalidRegex { pattern, source });
        }

        if matcher.contains('*') {
            return Pattern::new(matcher)
                .map(TagMatcher::Glob)
                .map_err(|source| VersionError::InvalidGlob {
                    pattern: matcher.to_string(),
                    source,
                });
        }

        Ok(TagMatcher::Exact(matcher.to_string()))
    }

    /// Version carried by `tag`, or `None` when the tag does not match.
    pub fn version(&self, tag: &str) -> Option<String> {
        match self {
            TagMatcher::Exact(expected) => {
                (expected == tag).then(|| strip_prefix(tag).to_string())
            }
            TagMatcher::Glob(pattern) => pattern
                .matches(tag)
                .then(|| strip_prefix(tag).to_string()),
            TagMatcher::Regex(regex) => regex.captures(tag).map(|captures| {
                captures
                    .name("version")
                    .map(|version| version.as_str().to_string())
                    .unwrap_or_else(|| strip_prefix(tag).to_string())
            }),
        }
    }
}

/// First non-prerelease in `releases` whose tag matches.
pub fn select_release<I>(releases: I, matcher: &TagMatcher) -> Option<(Release, String)>
where
    I: IntoIterator<Item = Release>,
{
    releases
        .into_iter()
        .filter(|release| !release.prerelease)
        .find_map(|release| {
            matcher
                .version(&release.tag_name)
                .map(|version| (release, version))
        })
}

#[async_trait]
pub trait ReleaseResolver: Send + Sync {
    /// Resolve a release and its version. Without a matcher this is the
    /// repository's latest release.
    async fn release_version(&self, reference: &ReleaseRef) -> Result<(Release, String)>;
}

/// [`ReleaseResolver`] backed by the GitHub REST API.
pub struct GithubReleases {
    client: Client,
    api: String,
    token: Option<String>,
}

impl GithubReleases {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            api: GITHUB_API.to_string(),
            token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
        }
    }

    pub fn with_api(mut self, api: impl Into<String>) -> Self {
        self.api = api.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.api);
        debug!("GET {url}");

        let mut request = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header(header::USER_AGENT, USER_AGENT);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(FetchError::from)?;
        let status = response.status().as_u16();
        if status >= 400 {
            return Err(FetchError::Status { url, status }.into());
        }

        Ok(response.json().await.map_err(FetchError::from)?)
    }

    async fn latest(&self, owner: &str, repo: &str) -> Result<Release> {
        self.get_json(&format!("/repos/{owner}/{repo}/releases/latest"))
            .await
    }

    async fn page(&self, owner: &str, repo: &str, page: usize) -> Result<Vec<Release>> {
        self.get_json(&format!(
            "/repos/{owner}/{repo}/releases?per_page={PER_PAGE}&page={page}"
        ))
        .await
    }
}

#[async_trait]
impl ReleaseResolver for GithubReleases {
    async fn release_version(&self, reference: &ReleaseRef) -> Result<(Release, String)> {
        let (owner, repo) = reference.owner_repo()?;

        let Some(matcher) = &reference.matcher else {
            let release = self.latest(owner, repo).await?;
            let version = strip_prefix(&release.tag_name).to_string();
            if version.is_empty() {
                return Err(VersionError::UnparsableTag {
                    repo: reference.repo.clone(),
                    tag: release.tag_name,
                });
            }
            info!("Latest release of {} is {}", reference.repo, release.tag_name);
            return Ok((release, version));
        };

        let tag_matcher = TagMatcher::parse(matcher)?;
        for page in 1.. {
            let releases = self.page(owner, repo, page).await?;
            let last = releases.len() < PER_PAGE;

            if let Some((release, version)) = select_release(releases, &tag_matcher) {
                info!("Selected release {} of {}", release.tag_name, reference.repo);
                return Ok((release, version));
            }
            if last {
                break;
            }
        }

        Err(VersionError::NoMatchingRelease {
            repo: reference.repo.clone(),
            matcher: matcher.clone(),
        })
    }
}
