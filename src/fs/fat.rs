use serde::Serialize;

use super::boot_sector::BootSector;
use super::geometry::Geometry;
use super::table::{decode_allocation_table, AllocationTable};
use super::tree::{build_directory_tree_with, DirectoryTree};
use super::version::{classify_version, data_cluster_count, FatVersion};
use super::InspectOptions;
use crate::device::SectorReader;
use crate::error::{FatError, Result};

/// An opened FAT12 or FAT32 volume.
///
/// Opening decodes the boot sector, classifies the version (rejecting FAT16)
/// and loads the first FAT copy. The directory tree is built on request.
pub struct FatVolume<S> {
    reader: S,
    boot: BootSector,
    version: FatVersion,
    geometry: Geometry,
    table: AllocationTable,
}

/// Summary of a volume's boot parameters and layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeInfo {
    pub device: String,
    pub version: FatVersion,
    pub oem_name: String,
    /// The blank-trimmed type string from the extended BPB, e.g. "FAT12".
    pub fs_type: String,
    pub volume_label: Option<String>,
    pub volume_serial: u32,
    pub capacity_bytes: u64,
    pub bytes_per_sector: u32,
    pub sectors_per_cluster: u32,
    /// Fixed root directory entries (FAT12); 0 on FAT32.
    pub root_entries: u32,
    pub sectors_per_fat: u32,
    pub reserved_sectors: u32,
    pub hidden_sectors: u32,
    pub first_fat_sector: u64,
    pub first_root_dir_sector: u64,
    pub first_data_sector: u64,
    pub data_clusters: u32,
    pub used_clusters: usize,
}

impl<S: SectorReader> FatVolume<S> {
    pub fn open(mut reader: S) -> Result<Self> {
        let boot = BootSector::read_from(&mut reader)?;
        let version = classify_version(&boot).ensure_supported()?;
        let geometry = Geometry::new(&boot, version)?;

        let fat_offset = geometry.sector_offset(geometry.first_fat_sector());
        let fat_bytes = reader.read_at(fat_offset, table_read_len(&boot, &geometry)?)?;
        let table = decode_allocation_table(&fat_bytes, &boot, version)?;

        log::info!(
            "opened {version} volume: {} bytes/sector, {} sectors/cluster, {} FAT entries",
            geometry.bytes_per_sector,
            geometry.sectors_per_cluster,
            table.len()
        );

        Ok(Self {
            reader,
            boot,
            version,
            geometry,
            table,
        })
    }

    pub fn boot_sector(&self) -> &BootSector {
        &self.boot
    }

    pub fn version(&self) -> FatVersion {
        self.version
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn table(&self) -> &AllocationTable {
        &self.table
    }

    /// Layout summary. `device` is only echoed back for display.
    pub fn info(&self, device: &str) -> Result<VolumeInfo> {
        let boot = &self.boot;
        let g = &self.geometry;
        let volume_serial = match self.version {
            FatVersion::Fat32 => boot.fat32.volume_serial,
            _ => boot.fat12.volume_serial,
        };
        Ok(VolumeInfo {
            device: device.to_string(),
            version: self.version,
            oem_name: boot.oem_name_str(),
            fs_type: boot.fs_type_tag(self.version),
            volume_label: boot.volume_label(self.version),
            volume_serial,
            capacity_bytes: boot.total_sectors() as u64 * boot.bytes_per_sector as u64,
            bytes_per_sector: g.bytes_per_sector,
            sectors_per_cluster: g.sectors_per_cluster,
            root_entries: g.root_entry_count,
            sectors_per_fat: g.sectors_per_fat,
            reserved_sectors: g.reserved_sectors,
            hidden_sectors: boot.hidden_sectors,
            first_fat_sector: g.first_fat_sector(),
            first_root_dir_sector: g.first_root_dir_sector()?,
            first_data_sector: g.first_data_sector(),
            data_clusters: data_cluster_count(boot),
            used_clusters: self.table.used_clusters(),
        })
    }

    pub fn directory_tree(&mut self) -> Result<DirectoryTree> {
        self.directory_tree_with(&InspectOptions::default())
    }

    pub fn directory_tree_with(&mut self, options: &InspectOptions) -> Result<DirectoryTree> {
        build_directory_tree_with(
            &self.boot,
            &self.table,
            self.version,
            &mut self.reader,
            options,
        )
    }

    pub fn into_inner(self) -> S {
        self.reader
    }
}

/// Bytes of the first FAT actually covering the data region, never more
/// than the region the boot sector declares.
fn table_read_len(boot: &BootSector, geometry: &Geometry) -> Result<usize> {
    let entries = data_cluster_count(boot) as u64 + 2;
    let needed = match geometry.version {
        FatVersion::Fat12 => (entries * 3).div_ceil(2),
        _ => entries * 4,
    };
    let len = needed.min(geometry.fat_size_bytes());
    usize::try_from(len)
        .map_err(|_| FatError::decode(format!("FAT region of {len} bytes is not addressable")))
}
