//! Streaming extraction of tarballs and zip files through a [`PathRemapper`]

use super::{ArchiveError, ArchiveFormat, CompressionReader, Decision, PathRemapper, Result};
use std::{
    fs::{self, File},
    io::{self, Cursor, Read},
    path::{Path, PathBuf},
};
use tracing::debug;

const DEFAULT_FILE_MODE: u32 = 0o644;
const DEFAULT_DIR_MODE: u32 = 0o755;
const SYMLINK_MODE: u32 = 0o120000;
const FILE_TYPE_MASK: u32 = 0o170000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    /// In-target paths that were written
    pub extracted_files: Vec<String>,
    pub total_size: u64,
}

impl ExtractionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: String, size: u64) {
        self.extracted_files.push(path);
        self.total_size += size;
    }

    pub fn file_count(&self) -> usize {
        self.extracted_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extracted_files.is_empty()
    }
}

/// Walk `body` as an archive of `format` and write every entry the remapper
/// accepts below `mount`.
pub fn extract_sync(
    format: ArchiveFormat,
    body: &[u8],
    remapper: &mut PathRemapper,
    mount: &Path,
) -> Result<ExtractionResult> {
    match CompressionReader::for_tar(format, Cursor::new(body))? {
        Some(reader) => extract_tar(reader, remapper, mount),
        None if format == ArchiveFormat::Zip => extract_zip(body, remapper, mount),
        None => Err(ArchiveError::UnsupportedFormat {
            filename: String::new(),
            format,
        }),
    }
}

fn extract_tar<R: Read>(
    reader: R,
    remapper: &mut PathRemapper,
    mount: &Path,
) -> Result<ExtractionResult> {
    let mut archive = tar::Archive::new(reader);
    let mut result = ExtractionResult::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let entry_type = entry.header().entry_type();
        let is_dir = entry_type.is_dir();

        if !is_dir && !entry_type.is_file() {
            debug!("Skipping {name:?}: unsupported entry type {entry_type:?}");
            continue;
        }

        let mode = entry.header().mode().unwrap_or(if is_dir {
            DEFAULT_DIR_MODE
        } else {
            DEFAULT_FILE_MODE
        });
        let size = entry.size();

        if let Decision::Extract(dst) = remapper.decide(&name, is_dir, mode) {
            let target = host_path(mount, &dst);
            let written = materialize(&mut entry, &target, is_dir, mode, size)?;
            debug!("Extracted {name:?} to {dst}");
            if !is_dir {
                result.add_file(dst, written);
            }
        }
    }

    Ok(result)
}

fn extract_zip(body: &[u8], remapper: &mut PathRemapper, mount: &Path) -> Result<ExtractionResult> {
    let mut archive = zip::ZipArchive::new(Cursor::new(body))?;
    let mut result = ExtractionResult::new();

    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        let name = file.name().to_string();
        let is_dir = file.is_dir();
        let unix_mode = file.unix_mode();

        if unix_mode.is_some_and(|mode| mode & FILE_TYPE_MASK == SYMLINK_MODE) {
            debug!("Skipping {name:?}: symbolic link");
            continue;
        }

        let mode = unix_mode
            .map(|mode| mode & 0o7777)
            .filter(|mode| *mode != 0)
            .unwrap_or(if is_dir {
                DEFAULT_DIR_MODE
            } else {
                DEFAULT_FILE_MODE
            });
        let size = file.size();

        if let Decision::Extract(dst) = remapper.decide(&name, is_dir, mode) {
            let target = host_path(mount, &dst);
            let written = materialize(&mut file, &target, is_dir, mode, size)?;
            debug!("Extracted {name:?} to {dst}");
            if !is_dir {
                result.add_file(dst, written);
            }
        }
    }

    Ok(result)
}

fn host_path(mount: &Path, dst: &str) -> PathBuf {
    mount.join(dst.trim_start_matches('/'))
}

/// Write one entry to `target`.
///
/// Directories that already exist are left as they are. Files are replaced
/// and must end up exactly `size` bytes long.
fn materialize(
    reader: &mut dyn Read,
    target: &Path,
    is_dir: bool,
    mode: u32,
    size: u64,
) -> Result<u64> {
    if is_dir {
        if !target.is_dir() {
            fs::create_dir_all(target)?;
            set_mode(target, mode)?;
        }
        return Ok(0);
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(target)?;
    let written = io::copy(reader, &mut file)?;
    drop(file);

    if written != size {
        return Err(ArchiveError::SizeMismatch {
            path: target.to_path_buf(),
            expected: size,
            actual: written,
        });
    }

    set_mode(target, mode)?;
    Ok(written)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
