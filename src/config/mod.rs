//! YAML configuration of containers and their assets

pub mod asset;
pub mod container;
pub mod error;

pub use asset::{ArchiveConfig, AssetConfig, FileConfig, PkgConfig, ReleaseConfig};
pub use container::{
    ContainerConfig, Entrypoint, EnvValue, UserSpec, DEFAULT_ARCHES, RUNTIME_BASE, STATIC_BASE,
};
pub use error::{ConfigError, Result};
