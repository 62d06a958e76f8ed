use serde::Serialize;

use super::boot_sector::BootSector;
use super::table::is_valid_cluster;
use super::version::FatVersion;
use crate::error::{FatError, Result};

/// Size of one directory record on disk.
pub const DIR_ENTRY_SIZE: usize = 32;

/// Sector layout of a supported volume, derived once from the boot sector
/// and the classified version.
///
/// All sector numbers are relative to the start of the volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Geometry {
    pub version: FatVersion,
    pub bytes_per_sector: u32,
    pub sectors_per_cluster: u32,
    pub reserved_sectors: u32,
    pub num_fats: u32,
    /// Sectors per FAT from the authoritative field group.
    pub sectors_per_fat: u32,
    /// Fixed root directory capacity (FAT12 only; 0 for FAT32).
    pub root_entry_count: u32,
    /// First cluster of the root directory (FAT32 only).
    pub root_cluster: u32,
}

impl Geometry {
    pub fn new(boot: &BootSector, version: FatVersion) -> Result<Self> {
        let version = version.ensure_supported()?;
        let (root_entry_count, root_cluster) = match version {
            FatVersion::Fat32 => (0, boot.fat32.root_cluster),
            _ => (boot.fat12.root_entry_count as u32, 0),
        };
        Ok(Self {
            version,
            bytes_per_sector: boot.bytes_per_sector as u32,
            sectors_per_cluster: boot.sectors_per_cluster as u32,
            reserved_sectors: boot.reserved_sectors as u32,
            num_fats: boot.num_fats as u32,
            sectors_per_fat: boot.sectors_per_fat_for(version),
            root_entry_count,
            root_cluster,
        })
    }

    /// The first FAT copy starts right after the reserved sectors.
    pub fn first_fat_sector(&self) -> u64 {
        self.reserved_sectors as u64
    }

    /// Size of one FAT copy in bytes.
    pub fn fat_size_bytes(&self) -> u64 {
        self.sectors_per_fat as u64 * self.bytes_per_sector as u64
    }

    /// Sectors occupied by the fixed FAT12 root region, rounded down.
    pub fn root_dir_sectors(&self) -> u64 {
        match self.version {
            FatVersion::Fat32 => 0,
            _ => self.root_dir_bytes() / self.bytes_per_sector as u64,
        }
    }

    /// Byte size of the fixed FAT12 root region.
    pub fn root_dir_bytes(&self) -> u64 {
        self.root_entry_count as u64 * DIR_ENTRY_SIZE as u64
    }

    fn after_fats(&self) -> u64 {
        self.first_fat_sector() + self.num_fats as u64 * self.sectors_per_fat as u64
    }

    pub fn first_data_sector(&self) -> u64 {
        self.after_fats() + self.root_dir_sectors()
    }

    /// FAT12: the fixed region after the FATs. FAT32: the first sector of
    /// the root cluster, which sits in the data region like any directory.
    pub fn first_root_dir_sector(&self) -> Result<u64> {
        match self.version {
            FatVersion::Fat32 => self.cluster_sector(self.root_cluster),
            _ => Ok(self.after_fats()),
        }
    }

    pub fn is_valid_cluster(&self, cluster: u32) -> bool {
        is_valid_cluster(cluster, self.version, self.root_cluster)
    }

    /// First sector of data cluster `cluster`.
    pub fn cluster_sector(&self, cluster: u32) -> Result<u64> {
        if !self.is_valid_cluster(cluster) {
            return Err(FatError::InvalidCluster {
                cluster,
                version: self.version,
            });
        }
        Ok(self.first_data_sector() + (cluster as u64 - 2) * self.sectors_per_cluster as u64)
    }

    pub fn cluster_size(&self) -> u64 {
        self.bytes_per_sector as u64 * self.sectors_per_cluster as u64
    }

    /// Byte offset of a sector from the start of the volume.
    pub fn sector_offset(&self, sector: u64) -> u64 {
        sector * self.bytes_per_sector as u64
    }

    pub fn cluster_offset(&self, cluster: u32) -> Result<u64> {
        Ok(self.sector_offset(self.cluster_sector(cluster)?))
    }
}
