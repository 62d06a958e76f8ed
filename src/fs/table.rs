use super::boot_sector::BootSector;
use super::le::FieldReader;
use super::version::{data_cluster_count, FatVersion};
use crate::error::{FatError, Result};

/// Top nibble of a FAT32 entry is reserved and never part of the link.
pub const FAT32_ENTRY_MASK: u32 = 0x0FFF_FFFF;

const FAT12_RESERVED_LOW: [u32; 2] = [0x000, 0x001];
const FAT12_END_OF_CHAIN: std::ops::RangeInclusive<u32> = 0xFF8..=0xFFF;
const FAT32_END_OF_CHAIN: std::ops::RangeInclusive<u32> = 0x0FFF_FFF8..=0x0FFF_FFFF;

/// Whether `cluster` names a real data cluster under `version`'s rules.
///
/// Free, reserved and end-of-chain markers are all "invalid". For FAT32
/// anything below the root cluster is invalid, and so are the FAT12/FAT16
/// style terminators 0xFF8-0xFFF and 0xFFF8-0xFFFF. The whole reserved
/// FAT32 end-of-chain range 0x0FFFFFF8-0x0FFFFFFF is rejected, not just
/// 0x0FFFFFFF.
pub fn is_valid_cluster(cluster: u32, version: FatVersion, root_cluster: u32) -> bool {
    match version {
        FatVersion::Fat12 => {
            !FAT12_RESERVED_LOW.contains(&cluster) && !FAT12_END_OF_CHAIN.contains(&cluster)
        }
        FatVersion::Fat32 => {
            cluster >= 2
                && cluster >= root_cluster
                && !(0x0FF8..=0x0FFF).contains(&cluster)
                && !(0xFFF8..=0xFFFF).contains(&cluster)
                && !FAT32_END_OF_CHAIN.contains(&cluster)
        }
        FatVersion::Fat16 => false,
    }
}

/// Decoded file allocation table: entry `n` is the link stored for cluster `n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationTable {
    version: FatVersion,
    root_cluster: u32,
    entries: Vec<u32>,
}

impl AllocationTable {
    /// Wrap already-decoded entries.
    pub fn from_entries(version: FatVersion, root_cluster: u32, entries: Vec<u32>) -> Self {
        Self {
            version,
            root_cluster,
            entries,
        }
    }

    pub fn version(&self) -> FatVersion {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Link value for `cluster`, `None` past the end of the table.
    pub fn get(&self, cluster: u32) -> Option<u32> {
        self.entries.get(cluster as usize).copied()
    }

    pub fn is_valid(&self, cluster: u32) -> bool {
        is_valid_cluster(cluster, self.version, self.root_cluster)
    }

    /// Data clusters whose entry is non-zero (allocated, bad or end-of-chain).
    pub fn used_clusters(&self) -> usize {
        self.entries.iter().skip(2).filter(|&&e| e != 0).count()
    }
}

/// Unpack FAT12 entries: every 3 bytes hold two 12-bit values, the low
/// 12 bits of the little-endian 24-bit word first.
pub fn decode_fat12_entries(raw: &[u8], count: usize) -> Result<Vec<u32>> {
    let needed = (count * 3).div_ceil(2);
    if raw.len() < needed {
        return Err(FatError::decode(format!(
            "FAT12 table needs {needed} bytes for {count} entries, got {}",
            raw.len()
        )));
    }

    let mut entries = Vec::with_capacity(count);
    for triple in raw[..needed].chunks(3) {
        let mut bytes = [0u8; 3];
        bytes[..triple.len()].copy_from_slice(triple);
        let combined = FieldReader::new(&bytes).uint_at(0, 3)?;
        entries.push(combined % 4096);
        entries.push(combined / 4096);
    }
    entries.truncate(count);
    Ok(entries)
}

/// FAT32 entries are 4 bytes; only the low 28 bits are significant.
pub fn decode_fat32_entries(raw: &[u8], count: usize) -> Result<Vec<u32>> {
    let needed = count * 4;
    if raw.len() < needed {
        return Err(FatError::decode(format!(
            "FAT32 table needs {needed} bytes for {count} entries, got {}",
            raw.len()
        )));
    }
    let r = FieldReader::new(raw);
    (0..count)
        .map(|i| Ok(r.u32_at(i * 4)? & FAT32_ENTRY_MASK))
        .collect()
}

/// Decode the first FAT copy.
///
/// The table covers entries 0 and 1 plus one entry per data cluster. When
/// the FAT region is too small to hold that many, the table is truncated to
/// what is on disk; chains that point past it fail later as corrupt.
pub fn decode_allocation_table(
    bytes: &[u8],
    boot: &BootSector,
    version: FatVersion,
) -> Result<AllocationTable> {
    let version = version.ensure_supported()?;
    let wanted = data_cluster_count(boot) as usize + 2;
    let capacity = match version {
        FatVersion::Fat12 => bytes.len() * 2 / 3,
        _ => bytes.len() / 4,
    };
    let count = if capacity < wanted {
        log::warn!(
            "FAT region holds {capacity} entries but the volume has {wanted}; truncating table"
        );
        capacity
    } else {
        wanted
    };

    let entries = match version {
        FatVersion::Fat12 => decode_fat12_entries(bytes, count)?,
        _ => decode_fat32_entries(bytes, count)?,
    };
    log::debug!("decoded {} {version} table entries", entries.len());

    let root_cluster = match version {
        FatVersion::Fat32 => boot.fat32.root_cluster,
        _ => 0,
    };
    Ok(AllocationTable::from_entries(version, root_cluster, entries))
}
