//! Asset records and their discriminated decoding

use crate::archive::{MappingRule, DEFAULT_DESTINATION};
use crate::assets::{
    ArchiveAsset, Asset, AssetKind, FileAsset, PackageAsset, ReleaseAsset, UrlAsset,
};
use crate::pkg::PackageDeployer;
use crate::version::{ReleaseRef, VersionConfig};
use serde::de::{Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn default_destination() -> String {
    DEFAULT_DESTINATION.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    pub archive: String,
    #[serde(default)]
    pub version: Option<VersionConfig>,
    #[serde(default)]
    pub files: Vec<MappingRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub file: String,
    #[serde(default)]
    pub version: Option<VersionConfig>,
    #[serde(default = "default_destination")]
    pub dst: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PkgConfig {
    pub pkg: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseConfig {
    /// `owner/repo`
    pub release: String,
    #[serde(default, rename = "ref", alias = "match")]
    pub reference: Option<String>,
    #[serde(default)]
    pub glob: Option<String>,
    #[serde(default)]
    pub files: Vec<MappingRule>,
}

/// One entry of a container's `assets` list.
///
/// Exactly one of `archive`, `file`, `pkg` or `release` selects the kind;
/// the record is then decoded strictly as that kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AssetConfig {
    Archive(ArchiveConfig),
    File(FileConfig),
    Pkg(PkgConfig),
    Release(ReleaseConfig),
}

impl AssetConfig {
    pub fn kind(&self) -> AssetKind {
        match self {
            AssetConfig::Archive(_) => AssetKind::Archive,
            AssetConfig::File(_) => AssetKind::File,
            AssetConfig::Pkg(_) => AssetKind::Package,
            AssetConfig::Release(_) => AssetKind::Release,
        }
    }

    pub fn mapping_rules(&self) -> &[MappingRule] {
        match self {
            AssetConfig::Archive(config) => &config.files,
            AssetConfig::Release(config) => &config.files,
            AssetConfig::File(_) | AssetConfig::Pkg(_) => &[],
        }
    }

    pub fn version(&self) -> Option<&VersionConfig> {
        match self {
            AssetConfig::Archive(config) => config.version.as_ref(),
            AssetConfig::File(config) => config.version.as_ref(),
            AssetConfig::Pkg(_) | AssetConfig::Release(_) => None,
        }
    }

    /// Build the runtime asset. Package records share `deployer`.
    pub fn to_asset(&self, deployer: &Arc<PackageDeployer>) -> Asset {
        match self {
            AssetConfig::Archive(config) => Asset::Archive(ArchiveAsset::new(
                url_asset(&config.archive, &config.version),
                config.files.clone(),
            )),
            AssetConfig::File(config) => Asset::File(FileAsset::new(
                url_asset(&config.file, &config.version),
                config.dst.clone(),
            )),
            AssetConfig::Pkg(config) => {
                Asset::Package(PackageAsset::new(config.pkg.clone(), Arc::clone(deployer)))
            }
            AssetConfig::Release(config) => Asset::Release(ReleaseAsset {
                release: ReleaseRef::new(config.release.clone(), config.reference.clone()),
                glob: config.glob.clone(),
                files: config.files.clone(),
            }),
        }
    }
}

fn url_asset(url: &str, version: &Option<VersionConfig>) -> UrlAsset {
    UrlAsset {
        url: url.to_string(),
        version: version.clone(),
    }
}

impl<'de> Deserialize<'de> for AssetConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_yaml::Value::deserialize(deserializer)?;
        let mapping = value
            .as_mapping()
            .ok_or_else(|| D::Error::custom("asset must be a mapping"))?;

        let kinds: Vec<AssetKind> = AssetKind::ALL
            .into_iter()
            .filter(|kind| mapping.contains_key(kind.as_str()))
            .collect();

        let kind = match kinds.as_slice() {
            [kind] => *kind,
            [] => {
                return Err(D::Error::custom(
                    "asset needs one of archive, file, pkg or release",
                ))
            }
            several => {
                let names: Vec<&str> = several.iter().map(AssetKind::as_str).collect();
                return Err(D::Error::custom(format!(
                    "asset has conflicting kinds: {}",
                    names.join(", ")
                )));
            }
        };

        match kind {
            AssetKind::Archive => serde_yaml::from_value(value).map(AssetConfig::Archive),
            AssetKind::File => serde_yaml::from_value(value).map(AssetConfig::File),
            AssetKind::Package => serde_yaml::from_value(value).map(AssetConfig::Pkg),
            AssetKind::Release => serde_yaml::from_value(value).map(AssetConfig::Release),
        }
        .map_err(D::Error::custom)
    }
}
