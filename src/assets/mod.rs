//! Deployable assets
//!
//! Every asset kind deploys into a [`DeployRoot`] through the same
//! [`Deployable`] contract and reports what it learned as an [`AssetInfo`].
//! The closed [`Asset`] enum is what configuration decodes into.

pub mod archive;
pub mod error;
pub mod file;
pub mod package;
pub mod release;
pub mod url;

pub use archive::{ArchiveAsset, DEFAULT_ARCHIVE_SOURCE};
pub use error::{AssetError, Result};
pub use file::FileAsset;
pub use package::PackageAsset;
pub use release::ReleaseAsset;
pub use url::{Download, UrlAsset};

use crate::net::Fetcher;
use crate::runner::CommandRunner;
use crate::types::{AssetInfo, ContainerInfo, DeployRoot};
use crate::version::ReleaseResolver;
use async_trait::async_trait;
use std::fmt;
use tracing::Instrument;

/// Collaborators available to an asset while it deploys
#[derive(Clone, Copy)]
pub struct DeployContext<'a> {
    pub runner: &'a dyn CommandRunner,
    pub fetcher: &'a dyn Fetcher,
    pub releases: &'a dyn ReleaseResolver,
    pub root: &'a DeployRoot,
}

#[async_trait]
pub trait Deployable: Send + Sync {
    async fn deploy(&self, ctx: &DeployContext<'_>, info: &ContainerInfo) -> Result<AssetInfo>;
}

/// Discriminator of an asset record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Archive,
    File,
    Package,
    Release,
}

impl AssetKind {
    pub const ALL: [AssetKind; 4] = [
        AssetKind::Archive,
        AssetKind::File,
        AssetKind::Package,
        AssetKind::Release,
    ];

    /// Configuration key selecting this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Archive => "archive",
            AssetKind::File => "file",
            AssetKind::Package => "pkg",
            AssetKind::Release => "release",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum Asset {
    Archive(ArchiveAsset),
    File(FileAsset),
    Package(PackageAsset),
    Release(ReleaseAsset),
}

impl Asset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Archive(_) => AssetKind::Archive,
            Asset::File(_) => AssetKind::File,
            Asset::Package(_) => AssetKind::Package,
            Asset::Release(_) => AssetKind::Release,
        }
    }

    /// Short human readable source of the asset
    pub fn source(&self) -> &str {
        match self {
            Asset::Archive(asset) => &asset.source.url,
            Asset::File(asset) => &asset.source.url,
            Asset::Package(asset) => &asset.name,
            Asset::Release(asset) => &asset.release.repo,
        }
    }
}

#[async_trait]
impl Deployable for Asset {
    async fn deploy(&self, ctx: &DeployContext<'_>, info: &ContainerInfo) -> Result<AssetInfo> {
        let span = tracing::info_span!("asset", kind = %self.kind(), source = self.source());

        async {
            match self {
                Asset::Archive(asset) => asset.deploy(ctx, info).await,
                Asset::File(asset) => asset.deploy(ctx, info).await,
                Asset::Package(asset) => asset.deploy(ctx, info).await,
                Asset::Release(asset) => asset.deploy(ctx, info).await,
            }
        }
        .instrument(span)
        .await
    }
}
