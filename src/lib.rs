//! Asset Deploy - materializes downloaded archives, single files, GitHub
//! release assets and FreeBSD packages into container root filesystems.
//!
//! A [`config::ContainerConfig`] lists the assets of one container. A
//! [`ContainerDeployer`] deploys them in order into a [`DeployRoot`] for one
//! target and reports the resulting [`ContainerMetadata`].

pub mod archive;
pub mod assets;
pub mod config;
pub mod deploy;
pub mod net;
pub mod pkg;
pub mod runner;
pub mod types;
pub mod version;

pub use deploy::{ContainerDeployer, ContainerMetadata};
pub use types::*;
