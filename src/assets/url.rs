//! Download preamble shared by URL based assets

use super::{DeployContext, Result};
use crate::net::file_name;
use crate::types::ContainerInfo;
use crate::version::VersionConfig;
use tracing::info;

/// A downloadable asset with an optional version source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlAsset {
    pub url: String,
    pub version: Option<VersionConfig>,
}

/// A fetched body together with the context it was fetched for
#[derive(Debug, Clone)]
pub struct Download {
    /// Context with the resolved version filled in
    pub info: ContainerInfo,
    pub url: String,
    pub filename: String,
    pub body: Vec<u8>,
}

impl UrlAsset {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: VersionConfig) -> Self {
        self.version = Some(version);
        self
    }

    /// Resolve the version if the context has none, expand the URL and
    /// fetch it.
    pub async fn download(&self, ctx: &DeployContext<'_>, info: &ContainerInfo) -> Result<Download> {
        let mut info = info.clone();
        if info.version.is_empty() {
            if let Some(version) = &self.version {
                info.version = version.resolve(&info, ctx.fetcher).await?;
            }
        }

        let url = info.apply(&self.url);
        let filename = file_name(&url)?;

        info!("Deploying {url}");
        let body = ctx.fetcher.get(&url).await?;

        Ok(Download {
            info,
            url,
            filename,
            body,
        })
    }
}
