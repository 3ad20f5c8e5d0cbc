//! Metadata inferred while deploying assets

use serde::Serialize;

/// What a single asset deploy learned about the produced root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssetInfo {
    pub inferred_version: Option<String>,
    pub inferred_entrypoint: Option<String>,
    pub annotations: Vec<String>,
}

impl AssetInfo {
    pub fn is_empty(&self) -> bool {
        self.inferred_version.is_none()
            && self.inferred_entrypoint.is_none()
            && self.annotations.is_empty()
    }

    /// Record the version unless one was already inferred.
    pub fn infer_version(&mut self, version: impl Into<String>) {
        let version = version.into();
        if self.inferred_version.is_none() && !version.is_empty() {
            self.inferred_version = Some(version);
        }
    }

    /// Record the entrypoint unless one was already inferred.
    pub fn infer_entrypoint(&mut self, entrypoint: impl Into<String>) {
        if self.inferred_entrypoint.is_none() {
            self.inferred_entrypoint = Some(entrypoint.into());
        }
    }

    pub fn annotate(&mut self, annotation: impl Into<String>) {
        self.annotations.push(annotation.into());
    }
}
