//! Container configuration records

use super::{AssetConfig, ConfigError, Result};
use crate::assets::{Asset, AssetKind};
use crate::pkg::{PackageDeployer, PkgSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

pub const DEFAULT_ARCHES: [&str; 2] = ["amd64", "arm64"];
pub const RUNTIME_BASE: &str = "freebsd:runtime";
pub const STATIC_BASE: &str = "freebsd:static";

/// Scalar environment value as written in YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for EnvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvValue::Bool(value) => write!(f, "{value}"),
            EnvValue::Integer(value) => write!(f, "{value}"),
            EnvValue::Float(value) => write!(f, "{value}"),
            EnvValue::String(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entrypoint {
    Command(String),
    Args(Vec<String>),
}

impl Entrypoint {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Entrypoint::Command(command) => vec![command.clone()],
            Entrypoint::Args(args) => args.clone(),
        }
    }
}

/// Runtime user, optionally created with a fixed uid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSpec {
    pub name: String,
    pub uid: Option<u32>,
}

impl FromStr for UserSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ConfigError::InvalidUser(s.to_string());

        let (name, uid) = match s.split_once('=') {
            Some((name, uid)) => (name, Some(uid.parse().map_err(|_| invalid())?)),
            None => (s, None),
        };

        let valid_name = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid_name {
            return Err(invalid());
        }

        Ok(Self {
            name: name.to_string(),
            uid,
        })
    }
}

/// One container: a base image, a root overlay and an ordered list of
/// assets, plus runtime settings carried into the image metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerConfig {
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub arch: Vec<String>,
    /// Directory copied over the root before any asset
    #[serde(default)]
    pub overlay: Option<PathBuf>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, EnvValue>,
    /// Shell script run in the root after all assets
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub entrypoint: Option<Entrypoint>,
    #[serde(default)]
    pub assets: Vec<AssetConfig>,
}

impl ContainerConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file. A relative overlay is resolved against
    /// the file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_yaml_str(&yaml)?;
        if let Some(dir) = path.parent() {
            config.overlay = config
                .overlay
                .take()
                .map(|overlay| if overlay.is_relative() { dir.join(overlay) } else { overlay });
        }
        Ok(config)
    }

    /// Checks that need no target: globs, regexes, user and asset count.
    pub fn validate(&self) -> Result<()> {
        if self.assets.is_empty() {
            return Err(ConfigError::NoAssets);
        }

        for asset in &self.assets {
            for rule in asset.mapping_rules() {
                rule.validate()?;
            }
            if let Some(version) = asset.version() {
                version.validate()?;
            }
        }

        self.user_spec()?;
        Ok(())
    }

    pub fn has_packages(&self) -> bool {
        self.assets
            .iter()
            .any(|asset| asset.kind() == AssetKind::Package)
    }

    /// Configured base, or the runtime base when packages are installed
    pub fn base_image(&self) -> &str {
        match &self.base {
            Some(base) => base,
            None if self.has_packages() => RUNTIME_BASE,
            None => STATIC_BASE,
        }
    }

    pub fn arches(&self) -> Vec<String> {
        if self.arch.is_empty() {
            DEFAULT_ARCHES.iter().map(|arch| arch.to_string()).collect()
        } else {
            self.arch.clone()
        }
    }

    pub fn user_spec(&self) -> Result<Option<UserSpec>> {
        self.user.as_deref().map(str::parse::<UserSpec>).transpose()
    }

    pub fn env_vars(&self) -> BTreeMap<String, String> {
        self.env
            .iter()
            .map(|(key, value)| (key.clone(), value.to_string()))
            .collect()
    }

    pub fn package_names(&self) -> Vec<String> {
        self.assets
            .iter()
            .filter_map(|asset| match asset {
                AssetConfig::Pkg(config) => Some(config.pkg.clone()),
                _ => None,
            })
            .collect()
    }

    /// Build the assets in declared order. All package records share one
    /// deployer holding every package name.
    pub fn build_assets(&self, settings: PkgSettings) -> Vec<Asset> {
        let deployer = Arc::new(PackageDeployer::new(self.package_names()).with_settings(settings));
        self.assets
            .iter()
            .map(|asset| asset.to_asset(&deployer))
            .collect()
    }
}
