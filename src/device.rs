use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{FatError, Result};

/// Byte-range access to a block device or image file.
///
/// The decoder never assumes a block size beyond what the boot sector
/// declares, so reads are expressed as (byte offset, length).
pub trait SectorReader {
    /// Read exactly `len` bytes starting at `offset`.
    fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>>;
}

impl<S: SectorReader + ?Sized> SectorReader for &mut S {
    fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        (**self).read_at(offset, len)
    }
}

/// A `SectorReader` over any seekable byte source (image file, raw device,
/// in-memory cursor).
pub struct ImageReader<R> {
    inner: R,
}

impl ImageReader<File> {
    /// Open an image file or block device read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self::new(file))
    }
}

impl<R: Read + Seek> ImageReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> SectorReader for ImageReader<R> {
    fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.inner.seek(SeekFrom::Start(offset))?;
        // `len` comes from on-disk fields; let the stream bound the buffer.
        let mut buf = Vec::new();
        (&mut self.inner).take(len as u64).read_to_end(&mut buf)?;
        if buf.len() < len {
            return Err(FatError::ShortRead {
                offset,
                expected: len,
                actual: buf.len(),
            });
        }
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_at_offset() {
        let data: Vec<u8> = (0..=255u8).collect();
        let mut reader = ImageReader::new(Cursor::new(data));
        let bytes = reader.read_at(16, 4).unwrap();
        assert_eq!(bytes, vec![16, 17, 18, 19]);
    }

    #[test]
    fn test_short_read_reports_counts() {
        let mut reader = ImageReader::new(Cursor::new(vec![0u8; 100]));
        match reader.read_at(90, 20) {
            Err(FatError::ShortRead {
                offset,
                expected,
                actual,
            }) => {
                assert_eq!(offset, 90);
                assert_eq!(expected, 20);
                assert_eq!(actual, 10);
            }
            other => panic!("expected ShortRead, got {other:?}"),
        }
    }

    #[test]
    fn test_oversized_length_is_short_read() {
        let mut reader = ImageReader::new(Cursor::new(vec![1u8; 8]));
        match reader.read_at(0, usize::MAX / 2) {
            Err(FatError::ShortRead {
                expected, actual, ..
            }) => {
                assert_eq!(expected, usize::MAX / 2);
                assert_eq!(actual, 8);
            }
            other => panic!("expected ShortRead, got {other:?}"),
        }
    }

    #[test]
    fn test_read_through_mut_ref() {
        fn first_two<S: SectorReader>(mut source: S) -> Vec<u8> {
            source.read_at(0, 2).unwrap()
        }

        let mut reader = ImageReader::new(Cursor::new(vec![7u8; 8]));
        assert_eq!(first_two(&mut reader), vec![7, 7]);
        assert_eq!(reader.read_at(6, 2).unwrap(), vec![7, 7]);
    }
}
