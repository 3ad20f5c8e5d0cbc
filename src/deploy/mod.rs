//! Deployment of whole container configurations

pub mod error;
pub mod manager;
pub mod metadata;

pub use error::{DeployError, Result};
pub use manager::{copy_overlay, ContainerDeployer};
pub use metadata::ContainerMetadata;
