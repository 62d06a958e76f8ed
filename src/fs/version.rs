use std::fmt;

use serde::Serialize;

use super::boot_sector::BootSector;
use crate::error::{FatError, Result};

/// FAT variant derived from the data-region cluster count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FatVersion {
    #[serde(rename = "FAT12")]
    Fat12,
    #[serde(rename = "FAT16")]
    Fat16,
    #[serde(rename = "FAT32")]
    Fat32,
}

/// Volumes with fewer data clusters than this are FAT12.
pub const FAT12_CLUSTER_LIMIT: u32 = 4085;
/// Volumes with fewer data clusters than this (and not FAT12) are FAT16.
pub const FAT16_CLUSTER_LIMIT: u32 = 65525;

impl FatVersion {
    pub fn from_cluster_count(clusters: u32) -> Self {
        if clusters < FAT12_CLUSTER_LIMIT {
            FatVersion::Fat12
        } else if clusters < FAT16_CLUSTER_LIMIT {
            FatVersion::Fat16
        } else {
            FatVersion::Fat32
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FatVersion::Fat12 => "FAT12",
            FatVersion::Fat16 => "FAT16",
            FatVersion::Fat32 => "FAT32",
        }
    }

    /// FAT16 is recognised so it can be rejected by name.
    pub fn is_supported(&self) -> bool {
        matches!(self, FatVersion::Fat12 | FatVersion::Fat32)
    }

    pub fn ensure_supported(self) -> Result<Self> {
        if self.is_supported() {
            Ok(self)
        } else {
            Err(FatError::UnsupportedVersion(self))
        }
    }
}

impl fmt::Display for FatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Number of clusters in the data region.
///
/// Root directory sectors are `entries * 32 / bytes_per_sector` without
/// rounding up. Subtractions saturate so a nonsensical BPB yields zero
/// clusters instead of wrapping.
pub fn data_cluster_count(boot: &BootSector) -> u32 {
    let total = boot.total_sectors();
    let fat_sectors = boot.num_fats as u32 * boot.sectors_per_fat();
    let root_sectors =
        (boot.fat12.root_entry_count as u32 * 32) / boot.bytes_per_sector as u32;
    let data_sectors = total
        .saturating_sub(boot.reserved_sectors as u32)
        .saturating_sub(fat_sectors)
        .saturating_sub(root_sectors);
    data_sectors / boot.sectors_per_cluster as u32
}

/// Classify the volume. This is the only discriminator between variants;
/// the BPB's filesystem-type tag is informational and never consulted.
pub fn classify_version(boot: &BootSector) -> FatVersion {
    let clusters = data_cluster_count(boot);
    let version = FatVersion::from_cluster_count(clusters);
    log::debug!("{clusters} data clusters -> {version}");
    version
}
