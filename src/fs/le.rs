//! Offset/width-driven extraction of little-endian fields from a byte buffer.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{FatError, Result};

/// A read-only view over an on-disk structure, addressed by absolute offset.
///
/// Every accessor bounds-checks and returns `FatError::Decode` when the
/// field would run past the end of the buffer.
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    data: &'a [u8],
}

impl<'a> FieldReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or_else(|| {
                FatError::decode(format!(
                    "field at offset {offset} ({len} bytes) runs past a {}-byte buffer",
                    self.data.len()
                ))
            })
    }

    pub fn u8_at(&self, offset: usize) -> Result<u8> {
        Ok(self.slice(offset, 1)?[0])
    }

    pub fn u16_at(&self, offset: usize) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.slice(offset, 2)?))
    }

    pub fn u32_at(&self, offset: usize) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.slice(offset, 4)?))
    }

    /// Decode an unsigned integer of 1 to 4 bytes.
    pub fn uint_at(&self, offset: usize, width: usize) -> Result<u32> {
        if !(1..=4).contains(&width) {
            return Err(FatError::decode(format!(
                "unsupported little-endian field width: {width}"
            )));
        }
        Ok(LittleEndian::read_uint(self.slice(offset, width)?, width) as u32)
    }

    /// Copy a fixed-length byte field verbatim.
    pub fn bytes_at<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.slice(offset, N)?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05];
        let r = FieldReader::new(&data);
        assert_eq!(r.u8_at(0).unwrap(), 0x01);
        assert_eq!(r.u16_at(0).unwrap(), 0x0201);
        assert_eq!(r.uint_at(0, 3).unwrap(), 0x030201);
        assert_eq!(r.u32_at(1).unwrap(), 0x05040302);
        assert_eq!(r.uint_at(1, 4).unwrap(), 0x05040302);
    }

    #[test]
    fn test_out_of_range_is_decode_error() {
        let data = [0u8; 4];
        let r = FieldReader::new(&data);
        assert!(matches!(r.u32_at(1), Err(FatError::Decode(_))));
        assert!(matches!(r.u8_at(usize::MAX), Err(FatError::Decode(_))));
        assert!(matches!(r.uint_at(0, 5), Err(FatError::Decode(_))));
    }

    #[test]
    fn test_bytes_at() {
        let data = *b"MSWIN4.1";
        let r = FieldReader::new(&data);
        let oem: [u8; 8] = r.bytes_at(0).unwrap();
        assert_eq!(&oem, b"MSWIN4.1");
        assert!(r.bytes_at::<9>(0).is_err());
    }
}
