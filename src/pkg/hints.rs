//! Library directories for the runtime linker hints file

use super::{PkgError, Result};
use crate::archive::clean_entry_name;
use std::collections::BTreeSet;
use std::path::Path;
use tokio::fs;
use tracing::warn;

pub const DEFAULT_LIBRARY_DIRS: [&str; 3] = ["/lib", "/usr/lib", "/usr/local/lib"];

/// Where packages drop extra library directories, relative to the root
pub const HINTS_DIR: &str = "usr/local/libdata/ldconfig";

/// Collect the default library directories plus every directory listed in
/// the root's ldconfig hint files, sorted and deduplicated.
///
/// Every directory is created below `mount` so the hints file never points
/// at a missing path.
pub async fn collect_library_dirs(mount: &Path) -> Result<Vec<String>> {
    let mut dirs: BTreeSet<String> = DEFAULT_LIBRARY_DIRS.iter().map(|d| d.to_string()).collect();

    let hints_dir = mount.join(HINTS_DIR);
    let mut files = Vec::new();

    match fs::read_dir(&hints_dir).await {
        Ok(mut entries) => {
            while let Some(entry) = entries.next_entry().await.map_err(|source| {
                PkgError::ReadHints {
                    path: hints_dir.clone(),
                    source,
                }
            })? {
                files.push(entry.path());
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(PkgError::ReadHints {
                path: hints_dir,
                source,
            })
        }
    }
    files.sort();

    for file in files {
        let content = fs::read_to_string(&file)
            .await
            .map_err(|source| PkgError::ReadHints {
                path: file.clone(),
                source,
            })?;
        for dir in parse_hints(&content) {
            match clean_entry_name(dir.trim_start_matches('/')) {
                Some(clean) => {
                    dirs.insert(format!("/{clean}"));
                }
                None => warn!("Ignoring library directory {dir:?} from {}", file.display()),
            }
        }
    }

    for dir in &dirs {
        let path = mount.join(dir.trim_start_matches('/'));
        fs::create_dir_all(&path)
            .await
            .map_err(|source| PkgError::CreateLibraryDir { path, source })?;
    }

    Ok(dirs.into_iter().collect())
}

/// Non-empty, non-comment lines of a hints file
pub fn parse_hints(content: &str) -> impl Iterator<Item = String> + '_ {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
}
