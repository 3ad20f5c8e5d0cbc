//! Selective extraction of downloaded archives into a deployment root
//!
//! Formats are identified by file name first and content second. Entries
//! are streamed once, in archive order, and each one is routed through a
//! [`PathRemapper`] built from the asset's mapping rules.

pub mod compression;
pub mod detection;
pub mod error;
pub mod extract;
pub mod remap;

pub use compression::CompressionReader;
pub use detection::{ArchiveDetector, ArchiveFormat};
pub use error::{ArchiveError, Result};
pub use extract::{extract_sync, ExtractionResult};
pub use remap::{
    clean_entry_name, expand_destination, file_destination, Decision, MappingRule, PathRemapper,
    DEFAULT_DESTINATION,
};

use crate::types::ContainerInfo;
use std::path::PathBuf;
use tokio::task;
use tracing::info;

/// What extracting one archive produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionOutcome {
    pub result: ExtractionResult,
    pub entrypoint: Option<String>,
}

/// Extract `body`, downloaded as `filename`, below `mount`.
///
/// Rules and destinations are validated before the archive is opened. The
/// walk itself runs on the blocking pool.
pub async fn extract_archive(
    filename: String,
    body: Vec<u8>,
    rules: Vec<MappingRule>,
    info: ContainerInfo,
    mount: PathBuf,
) -> Result<ExtractionOutcome> {
    let format = ArchiveDetector::identify(&filename, &body).ok_or_else(|| {
        ArchiveError::UnknownFormat {
            filename: filename.clone(),
        }
    })?;

    if !format.is_extraction_supported() {
        return Err(ArchiveError::UnsupportedFormat { filename, format });
    }

    let mut remapper = PathRemapper::new(filename.clone(), &rules, &info)?;
    info!("Extracting {filename} ({format:?})");

    task::spawn_blocking(move || {
        let result = extract_sync(format, &body, &mut remapper, &mount)?;
        info!(
            "Extracted {} files ({} bytes) from {filename}",
            result.file_count(),
            result.total_size
        );
        Ok(ExtractionOutcome {
            result,
            entrypoint: remapper.into_entrypoint(),
        })
    })
    .await
    .map_err(|e| ArchiveError::Task(e.to_string()))?
}
