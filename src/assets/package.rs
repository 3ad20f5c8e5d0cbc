//! Packages installed through the shared deployer

use super::{Deployable, DeployContext, Result};
use crate::pkg::PackageDeployer;
use crate::types::{AssetInfo, ContainerInfo};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct PackageAsset {
    pub name: String,
    deployer: Arc<PackageDeployer>,
}

impl PackageAsset {
    pub fn new(name: impl Into<String>, deployer: Arc<PackageDeployer>) -> Self {
        Self {
            name: name.into(),
            deployer,
        }
    }

    pub fn deployer(&self) -> &Arc<PackageDeployer> {
        &self.deployer
    }
}

#[async_trait]
impl Deployable for PackageAsset {
    async fn deploy(&self, ctx: &DeployContext<'_>, info: &ContainerInfo) -> Result<AssetInfo> {
        Ok(self.deployer.deploy(ctx.runner, ctx.root, info).await?)
    }
}
