//! Single downloaded files

use super::{AssetError, Deployable, DeployContext, Result, UrlAsset};
use crate::archive::{expand_destination, file_destination};
use crate::types::{AssetInfo, ContainerInfo};
use async_trait::async_trait;
use tokio::fs;
use tracing::info;

pub const FILE_MODE: u32 = 0o755;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAsset {
    pub source: UrlAsset,
    /// Destination template, a directory when it ends in `/`
    pub dst: String,
}

impl FileAsset {
    pub fn new(source: UrlAsset, dst: impl Into<String>) -> Self {
        Self {
            source,
            dst: dst.into(),
        }
    }
}

#[async_trait]
impl Deployable for FileAsset {
    async fn deploy(&self, ctx: &DeployContext<'_>, info: &ContainerInfo) -> Result<AssetInfo> {
        let download = self.source.download(ctx, info).await?;
        let dst = file_destination(
            &download.filename,
            &expand_destination(&self.dst, &download.info)?,
        );
        let path = ctx.root.host_path(&dst);

        let write = async {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&path, &download.body).await?;
            set_executable(&path).await
        };
        write.await.map_err(|source| AssetError::Write {
            path: path.clone(),
            source,
        })?;
        info!("Installed {} ({} bytes)", dst, download.body.len());

        let mut asset_info = AssetInfo::default();
        asset_info.infer_version(download.info.version);
        asset_info.infer_entrypoint(dst);
        Ok(asset_info)
    }
}

#[cfg(unix)]
async fn set_executable(path: &std::path::Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, std::fs::Permissions::from_mode(FILE_MODE)).await
}

#[cfg(not(unix))]
async fn set_executable(_path: &std::path::Path) -> std::io::Result<()> {
    Ok(())
}
