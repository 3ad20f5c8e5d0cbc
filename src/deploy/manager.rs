use crate::assets::{Asset, DeployContext, Deployable};
use crate::config::ContainerConfig;
use crate::deploy::{ContainerMetadata, DeployError, Result};
use crate::net::Fetcher;
use crate::pkg::PkgSettings;
use crate::runner::{Command, CommandRunner};
use crate::types::{ContainerInfo, DeployRoot};
use crate::version::ReleaseResolver;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::WalkDir;

const SBIN: &str = "/usr/local/sbin";
const SBIN_MODE: u32 = 0o711;

/// Deploys one container configuration into roots, one target at a time.
///
/// Package assets share a single installer, so a deployer must not be used
/// for two roots of the same architecture.
pub struct ContainerDeployer {
    config: ContainerConfig,
    assets: Vec<Asset>,
    runner: Arc<dyn CommandRunner>,
    fetcher: Arc<dyn Fetcher>,
    releases: Arc<dyn ReleaseResolver>,
}

impl ContainerDeployer {
    pub fn new(
        config: ContainerConfig,
        runner: Arc<dyn CommandRunner>,
        fetcher: Arc<dyn Fetcher>,
        releases: Arc<dyn ReleaseResolver>,
    ) -> Self {
        let assets = config.build_assets(PkgSettings::default());

        Self {
            config,
            assets,
            runner,
            fetcher,
            releases,
        }
    }

    pub fn with_pkg_settings(mut self, settings: PkgSettings) -> Self {
        self.assets = self.config.build_assets(settings);
        self
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub async fn deploy(&self, root: &DeployRoot, info: &ContainerInfo) -> Result<ContainerMetadata> {
        info!(
            "Deploying {} for {} into {}",
            info.package,
            info.arch,
            root.mount().display()
        );

        let mut metadata = ContainerMetadata::new(info, self.config.base_image());
        metadata.env = self.config.env_vars();
        if let Some(entrypoint) = &self.config.entrypoint {
            metadata.entrypoint = entrypoint.to_vec();
        }

        if let Some(overlay) = &self.config.overlay {
            copy_overlay(overlay.clone(), root.mount().to_path_buf()).await?;
        }

        if let Some(user) = self.config.user_spec()? {
            if let Some(uid) = user.uid {
                self.create_user(root, &user.name, uid).await?;
            }
            metadata.user = Some(format!("{0}:{0}", user.name));
        }

        let ctx = DeployContext {
            runner: self.runner.as_ref(),
            fetcher: self.fetcher.as_ref(),
            releases: self.releases.as_ref(),
            root,
        };

        for (index, asset) in self.assets.iter().enumerate() {
            let asset_info = asset
                .deploy(&ctx, info)
                .await
                .map_err(|source| DeployError::Asset {
                    index,
                    kind: asset.kind(),
                    source,
                })?;
            debug!("Asset #{index} produced {asset_info:?}");
            metadata.merge(asset_info);
        }

        restrict_sbin(root.host_path(SBIN)).await?;

        if let Some(script) = &self.config.script {
            info!("Running script in {}", root.logical().display());
            self.runner
                .run(
                    &Command::new("sh")
                        .arg("-e")
                        .current_dir(root.logical())
                        .stdin(script.as_bytes()),
                )
                .await?;
        }

        Ok(metadata)
    }

    async fn create_user(&self, root: &DeployRoot, name: &str, uid: u32) -> Result<()> {
        let rootdir = root.logical().to_string_lossy().into_owned();
        let uid = uid.to_string();

        info!("Creating user {name} ({uid})");
        self.runner
            .run(&Command::new("pw").args([
                "-R",
                rootdir.as_str(),
                "groupadd",
                "-n",
                name,
                "-g",
                uid.as_str(),
            ]))
            .await?;
        self.runner
            .run(&Command::new("pw").args([
                "-R",
                rootdir.as_str(),
                "useradd",
                "-n",
                name,
                "-u",
                uid.as_str(),
                "-g",
                name,
                "-d",
                "/nonexistent",
                "-s",
                "/sbin/nologin",
            ]))
            .await?;
        Ok(())
    }
}

/// Make `path` traversable but not listable by other users, when present.
async fn restrict_sbin(path: PathBuf) -> Result<()> {
    tokio::task::spawn_blocking(move || {
        if !path.is_dir() {
            return Ok(());
        }
        debug!("Restricting {} to {:o}", path.display(), SBIN_MODE);
        set_mode(&path, SBIN_MODE).map_err(|source| DeployError::Permissions { path, source })
    })
    .await
    .map_err(|e| DeployError::Task(e.to_string()))?
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

/// Copy `src` over `dst`, keeping symlinks as links. A missing overlay
/// directory is ignored.
pub async fn copy_overlay(src: PathBuf, dst: PathBuf) -> Result<()> {
    if !src.is_dir() {
        debug!("No overlay at {}", src.display());
        return Ok(());
    }

    info!("Copying overlay {}", src.display());
    tokio::task::spawn_blocking(move || copy_tree(&src, &dst))
        .await
        .map_err(|e| DeployError::Task(e.to_string()))?
}

fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    let overlay_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| DeployError::Overlay { path, source }
    };

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| DeployError::Overlay {
            path: src.to_path_buf(),
            source: e.into(),
        })?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| DeployError::Task(e.to_string()))?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            std::fs::create_dir_all(&target).map_err(overlay_error(entry.path()))?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target).map_err(overlay_error(entry.path()))?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(overlay_error(entry.path()))?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, target: &Path) -> std::io::Result<()> {
    let link = std::fs::read_link(src)?;
    if target.symlink_metadata().is_ok() {
        std::fs::remove_file(target)?;
    }
    std::os::unix::fs::symlink(link, target)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, target: &Path) -> std::io::Result<()> {
    std::fs::copy(src, target).map(|_| ())
}
