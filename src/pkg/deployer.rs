//! Installation of FreeBSD packages into a deployment root

use super::hints::collect_library_dirs;
use super::repos::{FreeBsdRelease, DEFAULT_REPOS_CONF, FREEBSD_REPOS};
use super::{PkgError, Result};
use crate::runner::{Command, CommandRunner};
use crate::types::{AssetInfo, ContainerInfo, DeployRoot};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

/// Paths and programs used while installing packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkgSettings {
    /// Host path of the repository configuration pkg reads
    pub repos_conf: PathBuf,
    pub cache_dir: String,
    pub pkg: String,
    pub ldconfig: String,
}

impl Default for PkgSettings {
    fn default() -> Self {
        Self {
            repos_conf: PathBuf::from(DEFAULT_REPOS_CONF),
            cache_dir: "/tmp/pkg".to_string(),
            pkg: "pkg".to_string(),
            ldconfig: "ldconfig".to_string(),
        }
    }
}

/// Installs every package of one container configuration, once per
/// architecture.
///
/// A single deployer is shared by all package assets of a configuration, so
/// the first package asset installs the whole list and the rest are no-ops.
#[derive(Debug, Default)]
pub struct PackageDeployer {
    packages: Vec<String>,
    settings: PkgSettings,
    done: Mutex<HashSet<String>>,
}

impl PackageDeployer {
    pub fn new(packages: Vec<String>) -> Self {
        Self {
            packages,
            ..Self::default()
        }
    }

    pub fn with_settings(mut self, settings: PkgSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    pub fn settings(&self) -> &PkgSettings {
        &self.settings
    }

    pub fn is_installed(&self, arch: &str) -> bool {
        self.done
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(arch)
    }

    /// Returns true when `arch` was not yet marked.
    fn mark(&self, arch: &str) -> bool {
        self.done
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(arch.to_string())
    }

    pub async fn deploy(
        &self,
        runner: &dyn CommandRunner,
        root: &DeployRoot,
        info: &ContainerInfo,
    ) -> Result<AssetInfo> {
        let mut asset_info = AssetInfo::default();

        if !self.mark(&info.arch) {
            return Ok(asset_info);
        }

        let release = FreeBsdRelease::parse(&info.freebsd)?;
        let first = self.packages.first().ok_or(PkgError::NoPackages)?;
        let abi = release.abi(&info.arch);
        let osversion = release.osversion();
        let rootdir = root.logical().to_string_lossy().into_owned();

        self.write_repos().await?;

        info!("Installing packages {:?} for {abi}", self.packages);
        runner
            .run(
                &self
                    .pkg_command(&abi, &osversion, &rootdir, "install")
                    .args(self.packages.iter().cloned()),
            )
            .await?;

        asset_info.infer_entrypoint(format!("/usr/local/bin/{first}"));

        let output = runner
            .output(
                &self
                    .pkg_command(&abi, &osversion, &rootdir, "query")
                    .arg("%v")
                    .args(self.packages.iter().cloned()),
            )
            .await?;

        for (package, version) in self.packages.iter().zip(output.lines()) {
            asset_info.infer_version(version);
            asset_info.annotate(format!("org.freebsd.pkg.{package}.version={version}"));
        }

        remove_best_effort(&root.host_path("/var/cache/pkg")).await;
        remove_best_effort(&root.host_path("/var/db/pkg")).await;

        let dirs = collect_library_dirs(root.mount()).await?;
        let hints = root.logical_path("/var/run/ld-elf.so.hints");

        runner
            .run(
                &Command::new(&self.settings.ldconfig)
                    .arg("-f")
                    .arg(hints.to_string_lossy())
                    .args(dirs),
            )
            .await?;

        Ok(asset_info)
    }

    async fn write_repos(&self) -> Result<()> {
        let path = &self.settings.repos_conf;
        let write = async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, FREEBSD_REPOS).await
        };

        write.await.map_err(|source| PkgError::WriteRepos {
            path: path.clone(),
            source,
        })
    }

    fn pkg_command(&self, abi: &str, osversion: &str, rootdir: &str, subcommand: &str) -> Command {
        Command::new(&self.settings.pkg)
            .args([subcommand, "--rootdir", rootdir])
            .env("ABI", abi)
            .env("ASSUME_ALWAYS_YES", "yes")
            .env("OSVERSION", osversion)
            .env("PKG_CACHEDIR", &self.settings.cache_dir)
    }
}

async fn remove_best_effort(path: &Path) {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not clean up {}: {e}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pkg_command_environment() {
        let deployer = PackageDeployer::new(vec!["curl".to_string()]);
        let command = deployer.pkg_command("FreeBSD:14:amd64", "1402000", "/work/root", "install");

        assert_eq!(command.program(), "pkg");
        assert_eq!(command.get_args(), ["install", "--rootdir", "/work/root"]);
        assert_eq!(
            command.get_env(),
            [
                ("ABI".to_string(), "FreeBSD:14:amd64".to_string()),
                ("ASSUME_ALWAYS_YES".to_string(), "yes".to_string()),
                ("OSVERSION".to_string(), "1402000".to_string()),
                ("PKG_CACHEDIR".to_string(), "/tmp/pkg".to_string()),
            ]
        );
    }

    #[test]
    fn test_mark_once_per_arch() {
        let deployer = PackageDeployer::new(vec!["curl".to_string()]);

        assert!(!deployer.is_installed("amd64"));
        assert!(deployer.mark("amd64"));
        assert!(!deployer.mark("amd64"));
        assert!(deployer.is_installed("amd64"));
        assert!(!deployer.is_installed("arm64"));
    }
}
