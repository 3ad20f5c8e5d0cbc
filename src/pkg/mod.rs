//! FreeBSD package installation into deployment roots

pub mod deployer;
pub mod error;
pub mod hints;
pub mod repos;

pub use deployer::{PackageDeployer, PkgSettings};
pub use error::{PkgError, Result};
pub use hints::{collect_library_dirs, DEFAULT_LIBRARY_DIRS};
pub use repos::{FreeBsdRelease, DEFAULT_REPOS_CONF, FREEBSD_REPOS};
