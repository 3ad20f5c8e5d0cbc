//! Archive format detection using file extensions and magic bytes

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar,
    TarGz,
    TarBz2,
    TarXz,
    TarZst,
    Zip,
    SevenZ,
    Rar,
}

impl ArchiveFormat {
    /// Whether entries of this format can be streamed by the extractor
    pub fn is_extraction_supported(&self) -> bool {
        !matches!(self, ArchiveFormat::SevenZ | ArchiveFormat::Rar)
    }
}

pub struct ArchiveDetector;

impl ArchiveDetector {
    /// Detect archive format from a file name
    pub fn detect_from_extension(filename: &str) -> Option<ArchiveFormat> {
        let filename = filename.to_lowercase();

        if filename.ends_with(".tar.gz") || filename.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else if filename.ends_with(".tar.bz2") || filename.ends_with(".tbz2") || filename.ends_with(".tbz") {
            Some(ArchiveFormat::TarBz2)
        } else if filename.ends_with(".tar.xz") || filename.ends_with(".txz") {
            Some(ArchiveFormat::TarXz)
        } else if filename.ends_with(".tar.zst") || filename.ends_with(".tzst") {
            Some(ArchiveFormat::TarZst)
        } else if filename.ends_with(".tar") {
            Some(ArchiveFormat::Tar)
        } else if filename.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else if filename.ends_with(".7z") {
            Some(ArchiveFormat::SevenZ)
        } else if filename.ends_with(".rar") {
            Some(ArchiveFormat::Rar)
        } else {
            None
        }
    }

    /// Detect archive format from the leading bytes of the content
    pub fn detect_from_magic_bytes(buffer: &[u8]) -> Option<ArchiveFormat> {
        if buffer.starts_with(b"PK\x03\x04") || buffer.starts_with(b"PK\x05\x06") {
            return Some(ArchiveFormat::Zip);
        }

        if buffer.starts_with(&[0x1f, 0x8b]) {
            return Some(ArchiveFormat::TarGz);
        }

        if buffer.starts_with(b"BZh") {
            return Some(ArchiveFormat::TarBz2);
        }

        if buffer.starts_with(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00]) {
            return Some(ArchiveFormat::TarXz);
        }

        if buffer.starts_with(&[0x28, 0xb5, 0x2f, 0xfd]) {
            return Some(ArchiveFormat::TarZst);
        }

        if buffer.get(257..262) == Some(b"ustar".as_slice()) {
            return Some(ArchiveFormat::Tar);
        }

        if buffer.starts_with(b"7z\xbc\xaf\x27\x1c") {
            return Some(ArchiveFormat::SevenZ);
        }

        if buffer.starts_with(b"Rar!\x1a\x07\x00") || buffer.starts_with(b"Rar!\x1a\x07\x01\x00") {
            return Some(ArchiveFormat::Rar);
        }

        None
    }

    /// Extension first, magic bytes as fallback
    pub fn identify(filename: &str, content: &[u8]) -> Option<ArchiveFormat> {
        Self::detect_from_extension(filename).or_else(|| Self::detect_from_magic_bytes(content))
    }
}
