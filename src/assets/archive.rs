//! Archives extracted through mapping rules

use super::{Deployable, DeployContext, Result, UrlAsset};
use crate::archive::{extract_archive, MappingRule, DEFAULT_DESTINATION};
use crate::types::{AssetInfo, ContainerInfo};
use async_trait::async_trait;

/// Source pattern used when an archive lists no files
pub const DEFAULT_ARCHIVE_SOURCE: &str = "**/{package}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveAsset {
    pub source: UrlAsset,
    pub files: Vec<MappingRule>,
}

impl ArchiveAsset {
    pub fn new(source: UrlAsset, files: Vec<MappingRule>) -> Self {
        Self { source, files }
    }

    /// Configured rules, or the single default rule
    pub fn rules(&self) -> Vec<MappingRule> {
        if self.files.is_empty() {
            vec![MappingRule::new(DEFAULT_ARCHIVE_SOURCE, DEFAULT_DESTINATION)]
        } else {
            self.files.clone()
        }
    }
}

#[async_trait]
impl Deployable for ArchiveAsset {
    async fn deploy(&self, ctx: &DeployContext<'_>, info: &ContainerInfo) -> Result<AssetInfo> {
        let download = self.source.download(ctx, info).await?;

        let outcome = extract_archive(
            download.filename,
            download.body,
            self.rules(),
            download.info.clone(),
            ctx.root.mount().to_path_buf(),
        )
        .await?;

        let mut asset_info = AssetInfo::default();
        asset_info.infer_version(download.info.version);
        if let Some(entrypoint) = outcome.entrypoint {
            asset_info.infer_entrypoint(entrypoint);
        }
        Ok(asset_info)
    }
}
