//! Decoding of raw 32-byte directory records into `FileNode` shells.
//!
//! A directory is a flat stream of records. Short (8.3) records describe one
//! entry each; VFAT records carry pieces of a long name and always precede
//! the short record they decorate, highest sequence number first.

use chrono::{NaiveDate, NaiveDateTime};

use super::chain::resolve_chain;
use super::entry::{EntryType, FileNode, ATTR_DIRECTORY, ATTR_VOLUME_ID};
use super::geometry::DIR_ENTRY_SIZE;
use super::le::FieldReader;
use super::table::{AllocationTable, FAT32_ENTRY_MASK};
use super::version::FatVersion;
use crate::error::{FatError, Result};

/// Attribute value of a VFAT record (read-only, hidden, system, volume).
pub const ATTR_LONG_NAME: u8 = 0x0F;

const END_OF_DIRECTORY: u8 = 0x00;
const DELETED: u8 = 0xE5;
const DELETED_KANJI: u8 = 0x05;

/// Byte offsets of the 13 UTF-16 units in a VFAT record: 5 at bytes 1-10,
/// 6 at bytes 14-25, 2 at bytes 28-31.
const LFN_UNIT_OFFSETS: [usize; 13] = [1, 3, 5, 7, 9, 14, 16, 18, 20, 22, 24, 28, 30];
const LFN_CHECKSUM_OFFSET: usize = 13;

/// 20 records hold 260 units, enough for the 255-character name limit.
pub const MAX_LFN_RECORDS: usize = 20;

const DOT: &[u8; 11] = b".          ";
const DOT_DOT: &[u8; 11] = b"..         ";

/// Result of decoding one directory buffer.
#[derive(Debug, Clone, Default)]
pub struct DirectoryListing {
    /// Live entries in on-disk order, with no parent or children assigned.
    pub entries: Vec<FileNode>,
    /// Records examined before the end-of-directory marker (or the end of
    /// the buffer).
    pub records_consumed: usize,
}

/// Decode a directory's raw records.
///
/// `buf` must be a whole number of 32-byte records. Each live short record
/// becomes one node whose chain is resolved against `table`.
pub fn decode_directory(buf: &[u8], table: &AllocationTable) -> Result<DirectoryListing> {
    if buf.len() % DIR_ENTRY_SIZE != 0 {
        return Err(FatError::decode(format!(
            "directory buffer of {} bytes is not a multiple of {DIR_ENTRY_SIZE}",
            buf.len()
        )));
    }

    let mut listing = DirectoryListing::default();
    let mut lfn: Vec<&[u8]> = Vec::new();

    for (index, record) in buf.chunks_exact(DIR_ENTRY_SIZE).enumerate() {
        let first = record[0];
        if first == END_OF_DIRECTORY {
            break;
        }
        listing.records_consumed = index + 1;

        if first == DELETED || first == DELETED_KANJI {
            log::trace!("record {index}: deleted");
            discard_orphans(&mut lfn, index);
            continue;
        }

        let attr = record[11];
        let is_lfn = attr & ATTR_LONG_NAME == ATTR_LONG_NAME;

        if attr & ATTR_VOLUME_ID != 0 && !is_lfn {
            log::trace!("record {index}: volume label");
            discard_orphans(&mut lfn, index);
            continue;
        }

        let raw_name = &record[0..11];
        if attr & ATTR_DIRECTORY != 0 && (raw_name == DOT || raw_name == DOT_DOT) {
            log::trace!("record {index}: dot entry");
            discard_orphans(&mut lfn, index);
            continue;
        }

        if is_lfn {
            if lfn.len() == MAX_LFN_RECORDS {
                return Err(FatError::decode(format!(
                    "long name at record {index} spans more than {MAX_LFN_RECORDS} records"
                )));
            }
            lfn.push(record);
            continue;
        }

        let node = decode_short_record(record, &lfn, table)?;
        lfn.clear();
        listing.entries.push(node);
    }

    if !lfn.is_empty() {
        log::warn!(
            "directory ends with {} long-name records and no short entry",
            lfn.len()
        );
    }

    log::debug!(
        "decoded {} entries from {} records",
        listing.entries.len(),
        listing.records_consumed
    );
    Ok(listing)
}

fn discard_orphans(lfn: &mut Vec<&[u8]>, index: usize) {
    if !lfn.is_empty() {
        log::warn!(
            "discarding {} long-name records not followed by a short entry (record {index})",
            lfn.len()
        );
        lfn.clear();
    }
}

/// Turn a short record, plus any VFAT records buffered before it, into a node.
fn decode_short_record(
    record: &[u8],
    lfn: &[&[u8]],
    table: &AllocationTable,
) -> Result<FileNode> {
    let r = FieldReader::new(record);
    let raw_name: [u8; 11] = r.bytes_at(0)?;
    let short_name = build_short_name(&raw_name[..8], &raw_name[8..]);

    let name = if lfn.is_empty() {
        short_name.clone()
    } else {
        let expected = lfn_checksum(&raw_name);
        if lfn.iter().any(|rec| rec[LFN_CHECKSUM_OFFSET] != expected) {
            log::warn!("long name checksum does not match short entry {short_name:?}");
        }
        let long = long_name(lfn)?;
        if long.is_empty() {
            short_name.clone()
        } else {
            long
        }
    };

    let attributes = r.u8_at(11)?;
    let entry_type = if attributes & ATTR_DIRECTORY != 0 {
        EntryType::Directory
    } else {
        EntryType::File
    };

    let low = r.u16_at(26)? as u32;
    let first_cluster = match table.version() {
        FatVersion::Fat32 => (((r.u16_at(20)? as u32) << 16) | low) & FAT32_ENTRY_MASK,
        _ => low,
    };
    let size = match entry_type {
        EntryType::File => r.u32_at(28)? as u64,
        EntryType::Directory => 0,
    };
    let chain = resolve_chain(first_cluster, table)?;

    Ok(FileNode {
        name,
        short_name,
        entry_type,
        size,
        attributes,
        first_cluster,
        chain,
        modified: fat_datetime(r.u16_at(24)?, r.u16_at(22)?),
        parent: None,
        children: Vec::new(),
    })
}

/// Reassemble a long name from VFAT records given in on-disk order.
///
/// The record nearest the short entry holds the first 13 units, so the
/// records are read back to front. Decoding stops at the first NUL or
/// 0xFFFF padding unit.
pub fn long_name(records: &[&[u8]]) -> Result<String> {
    let mut units: Vec<u16> = Vec::with_capacity(records.len() * LFN_UNIT_OFFSETS.len());
    'records: for record in records.iter().rev() {
        let r = FieldReader::new(record);
        for &offset in &LFN_UNIT_OFFSETS {
            let unit = r.u16_at(offset)?;
            if unit == 0x0000 || unit == 0xFFFF {
                break 'records;
            }
            units.push(unit);
        }
    }
    Ok(String::from_utf16_lossy(&units))
}

/// Checksum a VFAT record stores for the 11-byte short name it belongs to.
pub fn lfn_checksum(short_name: &[u8; 11]) -> u8 {
    short_name
        .iter()
        .fold(0u8, |sum, &b| sum.rotate_right(1).wrapping_add(b))
}

/// Build a DOS 8.3 name from the blank-padded name and extension fields.
///
/// Bytes 0x80-0xFF are OEM codepage (CP437), not UTF-8.
pub fn build_short_name(name: &[u8], ext: &[u8]) -> String {
    let name_str = decode_oem_string(name);
    let name_trimmed = name_str.trim_end_matches(' ');
    let ext_str = decode_oem_string(ext);
    let ext_trimmed = ext_str.trim_end_matches(' ');

    if ext_trimmed.is_empty() {
        name_trimmed.to_string()
    } else {
        format!("{name_trimmed}.{ext_trimmed}")
    }
}

fn decode_oem_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| cp437_to_char(b)).collect()
}

fn cp437_to_char(b: u8) -> char {
    if b < 0x80 {
        b as char
    } else {
        CP437_HIGH[b as usize - 0x80]
    }
}

#[rustfmt::skip]
const CP437_HIGH: [char; 128] = [
    // 0x80-0x8F
    'Ç','ü','é','â','ä','à','å','ç', 'ê','ë','è','ï','î','ì','Ä','Å',
    // 0x90-0x9F
    'É','æ','Æ','ô','ö','ò','û','ù', 'ÿ','Ö','Ü','¢','£','¥','₧','ƒ',
    // 0xA0-0xAF
    'á','í','ó','ú','ñ','Ñ','ª','º', '¿','⌐','¬','½','¼','¡','«','»',
    // 0xB0-0xBF
    '░','▒','▓','│','┤','╡','╢','╖', '╕','╣','║','╗','╝','╜','╛','┐',
    // 0xC0-0xCF
    '└','┴','┬','├','─','┼','╞','╟', '╚','╔','╩','╦','╠','═','╬','╧',
    // 0xD0-0xDF
    '╨','╤','╥','╙','╘','╒','╓','╫', '╪','┘','┌','█','▄','▌','▐','▀',
    // 0xE0-0xEF
    'α','ß','Γ','π','Σ','σ','µ','τ', 'Φ','Θ','Ω','δ','∞','φ','ε','∩',
    // 0xF0-0xFF
    '≡','±','≥','≤','⌠','⌡','÷','≈', '°','∙','·','√','ⁿ','²','■','\u{00A0}',
];

/// Decode a FAT date/time pair. `None` for a zero date or out-of-range
/// fields.
pub fn fat_datetime(date: u16, time: u16) -> Option<NaiveDateTime> {
    if date == 0 {
        return None;
    }
    let day = (date & 0x1F) as u32;
    let month = ((date >> 5) & 0x0F) as u32;
    let year = ((date >> 9) & 0x7F) as i32 + 1980;
    let second = (time & 0x1F) as u32 * 2;
    let minute = ((time >> 5) & 0x3F) as u32;
    let hour = ((time >> 11) & 0x1F) as u32;
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}
