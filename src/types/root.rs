//! Deployment root addressing

use std::path::{Path, PathBuf};

/// Where a deployment lands.
///
/// `mount` is the host path the engine writes to. `logical` is the same
/// directory as seen by commands started through a
/// [`CommandRunner`](crate::runner::CommandRunner); for a local runner the two
/// are usually identical, for a containerized runner `logical` is the path
/// inside the build container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRoot {
    mount: PathBuf,
    logical: PathBuf,
}

impl DeployRoot {
    pub fn new(mount: impl Into<PathBuf>) -> Self {
        let mount = mount.into();
        Self {
            logical: mount.clone(),
            mount,
        }
    }

    pub fn with_logical(mut self, logical: impl Into<PathBuf>) -> Self {
        self.logical = logical.into();
        self
    }

    pub fn mount(&self) -> &Path {
        &self.mount
    }

    pub fn logical(&self) -> &Path {
        &self.logical
    }

    /// Host path of an absolute in-target path such as `/usr/local/bin/app`.
    pub fn host_path(&self, target: &str) -> PathBuf {
        self.mount.join(target.trim_start_matches('/'))
    }

    /// Runner-visible path of an absolute in-target path.
    pub fn logical_path(&self, target: &str) -> PathBuf {
        self.logical.join(target.trim_start_matches('/'))
    }
}
