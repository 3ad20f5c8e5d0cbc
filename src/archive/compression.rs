//! Decompression of tarball streams

use super::ArchiveFormat;
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use std::io::{BufReader, Read};
use xz2::read::XzDecoder;

/// Wrapper for compression readers
pub enum CompressionReader<R: Read> {
    Plain(R),
    Gzip(GzDecoder<R>),
    Bzip2(BzDecoder<R>),
    Xz(XzDecoder<R>),
    Zstd(zstd::stream::read::Decoder<'static, BufReader<R>>),
}

impl<R: Read> CompressionReader<R> {
    /// Decoder for the compression layer of a tar-based format, `None` for
    /// formats that are not tarballs.
    pub fn for_tar(format: ArchiveFormat, reader: R) -> std::io::Result<Option<Self>> {
        Ok(match format {
            ArchiveFormat::Tar => Some(CompressionReader::Plain(reader)),
            ArchiveFormat::TarGz => Some(CompressionReader::Gzip(GzDecoder::new(reader))),
            ArchiveFormat::TarBz2 => Some(CompressionReader::Bzip2(BzDecoder::new(reader))),
            ArchiveFormat::TarXz => Some(CompressionReader::Xz(XzDecoder::new(reader))),
            ArchiveFormat::TarZst => Some(CompressionReader::Zstd(
                zstd::stream::read::Decoder::new(reader)?,
            )),
            ArchiveFormat::Zip | ArchiveFormat::SevenZ | ArchiveFormat::Rar => None,
        })
    }
}

impl<R: Read> Read for CompressionReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            CompressionReader::Plain(reader) => reader.read(buf),
            CompressionReader::Gzip(decoder) => decoder.read(buf),
            CompressionReader::Bzip2(decoder) => decoder.read(buf),
            CompressionReader::Xz(decoder) => decoder.read(buf),
            CompressionReader::Zstd(decoder) => decoder.read(buf),
        }
    }
}
