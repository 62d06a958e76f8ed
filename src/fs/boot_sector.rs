use serde::{Serialize, Serializer};

use super::le::FieldReader;
use super::version::FatVersion;
use crate::device::SectorReader;
use crate::error::{FatError, Result};

pub const BOOT_SECTOR_SIZE: usize = 512;

/// Fields only meaningful when the volume classifies as FAT12.
///
/// The root entry count, 16-bit total sectors and 16-bit sectors-per-FAT
/// live in the common BPB; the label and type tag come from the extended
/// BPB at offset 36.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fat12Fields {
    pub root_entry_count: u16,
    pub total_sectors: u16,
    pub sectors_per_fat: u16,
    pub drive_number: u8,
    pub extended_signature: u8,
    pub volume_serial: u32,
    #[serde(serialize_with = "serialize_text")]
    pub volume_label: [u8; 11],
    #[serde(serialize_with = "serialize_text")]
    pub fs_type: [u8; 8],
}

/// Fields only meaningful when the volume classifies as FAT32.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fat32Fields {
    pub total_sectors: u32,
    pub sectors_per_fat: u32,
    pub mirror_flags: u16,
    pub fs_version: u16,
    pub root_cluster: u32,
    pub fs_info_sector: u16,
    pub backup_boot_sector: u16,
    #[serde(skip)]
    pub reserved: [u8; 12],
    pub drive_number: u8,
    pub extended_signature: u8,
    pub volume_serial: u32,
    #[serde(serialize_with = "serialize_text")]
    pub volume_label: [u8; 11],
    #[serde(serialize_with = "serialize_text")]
    pub fs_type: [u8; 8],
}

/// The decoded first sector of the volume.
///
/// Both field groups are always populated because the FAT12 extended BPB and
/// the FAT32 BPB physically overlap; `FatVersion` decides which one is
/// authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootSector {
    pub jump_code: [u8; 3],
    #[serde(serialize_with = "serialize_text")]
    pub oem_name: [u8; 8],
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub num_fats: u8,
    pub media_descriptor: u8,
    pub sectors_per_track: u16,
    pub num_heads: u16,
    pub hidden_sectors: u32,
    pub fat12: Fat12Fields,
    pub fat32: Fat32Fields,
    /// Bytes 510..512; 0xAA55 on formatted volumes but not enforced.
    pub signature: u16,
}

/// Decode the first 512 bytes of a volume.
///
/// Only structural problems are reported here: a buffer shorter than one
/// boot sector, or a zero bytes-per-sector / sectors-per-cluster value that
/// would make every later geometry computation divide by zero.
pub fn decode_boot_sector(bytes: &[u8]) -> Result<BootSector> {
    if bytes.len() < BOOT_SECTOR_SIZE {
        return Err(FatError::decode(format!(
            "boot sector needs {BOOT_SECTOR_SIZE} bytes, got {}",
            bytes.len()
        )));
    }
    let r = FieldReader::new(&bytes[..BOOT_SECTOR_SIZE]);

    let bytes_per_sector = r.u16_at(11)?;
    if bytes_per_sector == 0 {
        return Err(FatError::decode("invalid bytes per sector: 0"));
    }
    let sectors_per_cluster = r.u8_at(13)?;
    if sectors_per_cluster == 0 {
        return Err(FatError::decode("invalid sectors per cluster: 0"));
    }

    let fat12 = Fat12Fields {
        root_entry_count: r.u16_at(17)?,
        total_sectors: r.u16_at(19)?,
        sectors_per_fat: r.u16_at(22)?,
        drive_number: r.u8_at(36)?,
        extended_signature: r.u8_at(38)?,
        volume_serial: r.u32_at(39)?,
        volume_label: r.bytes_at(43)?,
        fs_type: r.bytes_at(54)?,
    };

    let fat32 = Fat32Fields {
        total_sectors: r.u32_at(32)?,
        sectors_per_fat: r.u32_at(36)?,
        mirror_flags: r.u16_at(40)?,
        fs_version: r.u16_at(42)?,
        root_cluster: r.u32_at(44)?,
        fs_info_sector: r.u16_at(48)?,
        backup_boot_sector: r.u16_at(50)?,
        reserved: r.bytes_at(52)?,
        drive_number: r.u8_at(64)?,
        extended_signature: r.u8_at(66)?,
        volume_serial: r.u32_at(67)?,
        volume_label: r.bytes_at(71)?,
        fs_type: r.bytes_at(82)?,
    };

    let boot = BootSector {
        jump_code: r.bytes_at(0)?,
        oem_name: r.bytes_at(3)?,
        bytes_per_sector,
        sectors_per_cluster,
        reserved_sectors: r.u16_at(14)?,
        num_fats: r.u8_at(16)?,
        media_descriptor: r.u8_at(21)?,
        sectors_per_track: r.u16_at(24)?,
        num_heads: r.u16_at(26)?,
        hidden_sectors: r.u32_at(28)?,
        fat12,
        fat32,
        signature: r.u16_at(510)?,
    };

    log::debug!(
        "boot sector: {} bytes/sector, {} sectors/cluster, {} reserved, {} FATs",
        boot.bytes_per_sector,
        boot.sectors_per_cluster,
        boot.reserved_sectors,
        boot.num_fats
    );

    Ok(boot)
}

impl BootSector {
    /// Read and decode sector 0 from a device.
    pub fn read_from<S: SectorReader>(reader: &mut S) -> Result<Self> {
        let bytes = reader.read_at(0, BOOT_SECTOR_SIZE)?;
        decode_boot_sector(&bytes)
    }

    /// Total sectors: the 16-bit field if non-zero, else the 32-bit one.
    pub fn total_sectors(&self) -> u32 {
        if self.fat12.total_sectors != 0 {
            self.fat12.total_sectors as u32
        } else {
            self.fat32.total_sectors
        }
    }

    /// Sectors per FAT with the same 16-bit-first fallback as `total_sectors`.
    pub fn sectors_per_fat(&self) -> u32 {
        if self.fat12.sectors_per_fat != 0 {
            self.fat12.sectors_per_fat as u32
        } else {
            self.fat32.sectors_per_fat
        }
    }

    /// Sectors per FAT taken from the group `version` makes authoritative.
    pub fn sectors_per_fat_for(&self, version: FatVersion) -> u32 {
        match version {
            FatVersion::Fat32 => self.fat32.sectors_per_fat,
            FatVersion::Fat12 | FatVersion::Fat16 => self.fat12.sectors_per_fat as u32,
        }
    }

    pub fn oem_name_str(&self) -> String {
        text_field(&self.oem_name)
    }

    /// Volume label from the authoritative extended BPB, `None` when blank
    /// or the formatter's "NO NAME" placeholder.
    pub fn volume_label(&self, version: FatVersion) -> Option<String> {
        let raw = match version {
            FatVersion::Fat32 => &self.fat32.volume_label,
            FatVersion::Fat12 | FatVersion::Fat16 => &self.fat12.volume_label,
        };
        let label = text_field(raw);
        if label.is_empty() || label == "NO NAME" {
            None
        } else {
            Some(label)
        }
    }

    pub fn fs_type_tag(&self, version: FatVersion) -> String {
        match version {
            FatVersion::Fat32 => text_field(&self.fat32.fs_type),
            FatVersion::Fat12 | FatVersion::Fat16 => text_field(&self.fat12.fs_type),
        }
    }
}

/// Render a blank-padded on-disk text field, dropping NULs and trailing
/// spaces. Non-ASCII bytes are replaced rather than guessed at.
pub(crate) fn text_field(raw: &[u8]) -> String {
    raw.iter()
        .map(|&b| match b {
            0 => ' ',
            0x20..=0x7E => b as char,
            _ => '\u{FFFD}',
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn serialize_text<S: Serializer, const N: usize>(
    raw: &[u8; N],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&text_field(raw))
}
