//! Metadata describing a deployed root

use crate::types::{AssetInfo, ContainerInfo};
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything an image builder needs besides the root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainerMetadata {
    pub project: String,
    pub package: String,
    pub arch: String,
    pub triple: String,
    pub freebsd: String,
    pub base: String,
    pub version: Option<String>,
    pub entrypoint: Vec<String>,
    pub annotations: Vec<String>,
    pub env: BTreeMap<String, String>,
    /// `user:group` the image runs as
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl ContainerMetadata {
    pub fn new(info: &ContainerInfo, base: impl Into<String>) -> Self {
        Self {
            project: info.project.clone(),
            package: info.package.clone(),
            arch: info.arch.clone(),
            triple: info.triple.clone(),
            freebsd: info.freebsd.clone(),
            base: base.into(),
            version: Some(info.version.clone()).filter(|v| !v.is_empty()),
            ..Self::default()
        }
    }

    /// Fold one asset's result in. The first version and entrypoint win,
    /// annotations accumulate in order.
    pub fn merge(&mut self, asset: AssetInfo) {
        if self.version.is_none() {
            self.version = asset.inferred_version;
        }
        if self.entrypoint.is_empty() {
            if let Some(entrypoint) = asset.inferred_entrypoint {
                self.entrypoint = vec![entrypoint];
            }
        }
        self.annotations.extend(asset.annotations);
    }
}
