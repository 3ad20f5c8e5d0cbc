pub mod asset_info;
pub mod container;
pub mod root;

pub use asset_info::AssetInfo;
pub use container::{target_triple, ContainerInfo};
pub use root::DeployRoot;
