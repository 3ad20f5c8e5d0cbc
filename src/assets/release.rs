//! Archives picked from a GitHub release

use super::{ArchiveAsset, AssetError, Deployable, DeployContext, Result, UrlAsset};
use crate::archive::MappingRule;
use crate::types::{AssetInfo, ContainerInfo};
use crate::version::ReleaseRef;
use async_trait::async_trait;
use glob::Pattern;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub release: ReleaseRef,
    /// Pattern for the release file name; every file matches when absent
    pub glob: Option<String>,
    pub files: Vec<MappingRule>,
}

impl ReleaseAsset {
    fn pattern(&self, info: &ContainerInfo) -> Result<Option<Pattern>> {
        self.glob
            .as_deref()
            .map(|glob| {
                let glob = info.apply(glob);
                Pattern::new(&glob).map_err(|source| AssetError::InvalidGlob {
                    pattern: glob.clone(),
                    source,
                })
            })
            .transpose()
    }
}

#[async_trait]
impl Deployable for ReleaseAsset {
    async fn deploy(&self, ctx: &DeployContext<'_>, info: &ContainerInfo) -> Result<AssetInfo> {
        info!("Resolving release in {:?}", self.release.repo);
        let (release, version) = ctx.releases.release_version(&self.release).await?;
        let pattern = self.pattern(info)?;

        let Some(file) = release
            .assets
            .iter()
            .find(|file| pattern.as_ref().map_or(true, |p| p.matches(&file.name)))
        else {
            return Err(AssetError::NoMatchingAsset {
                repo: self.release.repo.clone(),
                glob: self.glob.clone().unwrap_or_default(),
            });
        };

        info!("Using {} from {}", file.name, release.tag_name);

        let mut info = info.clone();
        if info.version.is_empty() {
            info.version = version.clone();
        }

        let archive = ArchiveAsset::new(
            UrlAsset::new(file.browser_download_url.clone()),
            self.files.clone(),
        );
        let mut asset_info = archive.deploy(ctx, &info).await?;

        asset_info.inferred_version = Some(version.clone());
        if let Ok((owner, repo)) = self.release.owner_repo() {
            asset_info.annotate(format!("com.github.repos.{owner}.{repo}.version={version}"));
        }
        Ok(asset_info)
    }
}
