//! Synthetic FAT12/FAT16/FAT32 volumes for unit tests.
//!
//! FAT12 layout (512-byte sectors, 1 sector per cluster):
//!   sector 0      boot sector
//!   sector 1, 2   FAT copies
//!   sector 3      root directory (16 entries)
//!   sector 4..64  data clusters 2..62
//!
//! FAT32 layout: 32 reserved sectors, two 520-sector FATs, data (root at
//! cluster 2) from sector 1072. Only the first few data clusters are
//! materialised; the declared volume is much larger.

use std::io::Cursor;

use crate::device::ImageReader;

pub const FAT12_TOTAL_SECTORS: u16 = 64;
pub const FAT12_DATA_OFFSET: usize = 4 * 512;
pub const FAT12_ROOT_OFFSET: usize = 3 * 512;

pub const FAT32_RESERVED: u16 = 32;
pub const FAT32_SECTORS_PER_FAT: u32 = 520;
pub const FAT32_DATA_CLUSTERS: u32 = 65600;
pub const FAT32_DATA_SECTOR: u32 = FAT32_RESERVED as u32 + 2 * FAT32_SECTORS_PER_FAT;
pub const FAT32_TOTAL_SECTORS: u32 = FAT32_DATA_SECTOR + FAT32_DATA_CLUSTERS;

fn common_bpb(raw: &mut [u8; 512], reserved: u16, root_entries: u16, media: u8) {
    raw[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
    raw[3..11].copy_from_slice(b"MSWIN4.1");
    raw[11..13].copy_from_slice(&512u16.to_le_bytes());
    raw[13] = 1;
    raw[14..16].copy_from_slice(&reserved.to_le_bytes());
    raw[16] = 2;
    raw[17..19].copy_from_slice(&root_entries.to_le_bytes());
    raw[21] = media;
    raw[24..26].copy_from_slice(&18u16.to_le_bytes());
    raw[26..28].copy_from_slice(&2u16.to_le_bytes());
    raw[510] = 0x55;
    raw[511] = 0xAA;
}

pub fn fat12_boot_sector() -> [u8; 512] {
    let mut raw = [0u8; 512];
    common_bpb(&mut raw, 1, 16, 0xF0);
    raw[19..21].copy_from_slice(&FAT12_TOTAL_SECTORS.to_le_bytes());
    raw[22..24].copy_from_slice(&1u16.to_le_bytes());
    raw[38] = 0x29;
    raw[39..43].copy_from_slice(&0xCAFE_F00Du32.to_le_bytes());
    raw[43..54].copy_from_slice(b"TESTDISK   ");
    raw[54..62].copy_from_slice(b"FAT12   ");
    raw
}

pub fn fat16_boot_sector() -> [u8; 512] {
    let mut raw = [0u8; 512];
    common_bpb(&mut raw, 1, 512, 0xF8);
    raw[19..21].copy_from_slice(&20000u16.to_le_bytes());
    raw[22..24].copy_from_slice(&40u16.to_le_bytes());
    raw[54..62].copy_from_slice(b"FAT16   ");
    raw
}

pub fn fat32_boot_sector() -> [u8; 512] {
    let mut raw = [0u8; 512];
    common_bpb(&mut raw, FAT32_RESERVED, 0, 0xF8);
    raw[32..36].copy_from_slice(&FAT32_TOTAL_SECTORS.to_le_bytes());
    raw[36..40].copy_from_slice(&FAT32_SECTORS_PER_FAT.to_le_bytes());
    raw[44..48].copy_from_slice(&2u32.to_le_bytes());
    raw[48..50].copy_from_slice(&1u16.to_le_bytes());
    raw[50..52].copy_from_slice(&6u16.to_le_bytes());
    raw[64] = 0x80;
    raw[66] = 0x29;
    raw[67..71].copy_from_slice(&0x1234_5678u32.to_le_bytes());
    raw[71..82].copy_from_slice(b"NO NAME    ");
    raw[82..90].copy_from_slice(b"FAT32   ");
    raw
}

#[derive(Clone, Copy, PartialEq)]
enum Kind {
    Fat12,
    Fat32,
}

/// A writable in-memory volume.
#[derive(Clone)]
pub struct TestImage {
    pub bytes: Vec<u8>,
    kind: Kind,
}

impl TestImage {
    pub fn fat12() -> Self {
        let mut bytes = vec![0u8; FAT12_TOTAL_SECTORS as usize * 512];
        bytes[..512].copy_from_slice(&fat12_boot_sector());
        let mut image = Self {
            bytes,
            kind: Kind::Fat12,
        };
        image.set_fat(0, 0xFF0);
        image.set_fat(1, 0xFFF);
        image
    }

    /// A FAT32 volume with `clusters` data clusters backed by real bytes.
    /// Cluster 2 holds the (empty) root directory.
    pub fn fat32(clusters: usize) -> Self {
        let len = FAT32_DATA_SECTOR as usize * 512 + clusters * 512;
        let mut bytes = vec![0u8; len];
        bytes[..512].copy_from_slice(&fat32_boot_sector());
        let mut image = Self {
            bytes,
            kind: Kind::Fat32,
        };
        image.set_fat(0, 0x0FFF_FFF8);
        image.set_fat(1, 0x0FFF_FFFF);
        image.set_fat(2, 0x0FFF_FFFF);
        image
    }

    fn fat_offsets(&self) -> [usize; 2] {
        match self.kind {
            Kind::Fat12 => [512, 1024],
            Kind::Fat32 => {
                let first = FAT32_RESERVED as usize * 512;
                [first, first + FAT32_SECTORS_PER_FAT as usize * 512]
            }
        }
    }

    /// Write `value` into both FAT copies.
    pub fn set_fat(&mut self, cluster: u32, value: u32) {
        for base in self.fat_offsets() {
            match self.kind {
                Kind::Fat12 => {
                    let off = base + (cluster as usize * 3) / 2;
                    let v = value & 0x0FFF;
                    if cluster & 1 == 0 {
                        self.bytes[off] = (v & 0xFF) as u8;
                        self.bytes[off + 1] = (self.bytes[off + 1] & 0xF0) | (v >> 8) as u8;
                    } else {
                        self.bytes[off] = (self.bytes[off] & 0x0F) | ((v & 0x0F) << 4) as u8;
                        self.bytes[off + 1] = (v >> 4) as u8;
                    }
                }
                Kind::Fat32 => {
                    let off = base + cluster as usize * 4;
                    self.bytes[off..off + 4].copy_from_slice(&value.to_le_bytes());
                }
            }
        }
    }

    /// Link `clusters` into a chain terminated by an end-of-chain marker.
    pub fn chain(&mut self, clusters: &[u32]) {
        let eoc = match self.kind {
            Kind::Fat12 => 0xFFF,
            Kind::Fat32 => 0x0FFF_FFFF,
        };
        for pair in clusters.windows(2) {
            self.set_fat(pair[0], pair[1]);
        }
        if let Some(&last) = clusters.last() {
            self.set_fat(last, eoc);
        }
    }

    pub fn cluster_offset(&self, cluster: u32) -> usize {
        let data = match self.kind {
            Kind::Fat12 => FAT12_DATA_OFFSET,
            Kind::Fat32 => FAT32_DATA_SECTOR as usize * 512,
        };
        data + (cluster as usize - 2) * 512
    }

    pub fn write_dir_entry(&mut self, cluster: u32, index: usize, entry: &[u8; 32]) {
        let off = self.cluster_offset(cluster) + index * 32;
        self.bytes[off..off + 32].copy_from_slice(entry);
    }

    pub fn write_root_entry(&mut self, index: usize, entry: &[u8; 32]) {
        match self.kind {
            Kind::Fat12 => {
                let off = FAT12_ROOT_OFFSET + index * 32;
                self.bytes[off..off + 32].copy_from_slice(entry);
            }
            Kind::Fat32 => self.write_dir_entry(2, index, entry),
        }
    }

    pub fn reader(self) -> ImageReader<Cursor<Vec<u8>>> {
        ImageReader::new(Cursor::new(self.bytes))
    }
}

/// A short (8.3) directory record.
pub fn short_entry(name: &[u8; 11], attr: u8, cluster: u32, size: u32) -> [u8; 32] {
    let mut e = [0u8; 32];
    e[0..11].copy_from_slice(name);
    e[11] = attr;
    e[20..22].copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
    e[26..28].copy_from_slice(&(cluster as u16).to_le_bytes());
    e[28..32].copy_from_slice(&size.to_le_bytes());
    e
}

pub fn lfn_checksum(short: &[u8; 11]) -> u8 {
    short
        .iter()
        .fold(0u8, |sum, &b| sum.rotate_right(1).wrapping_add(b))
}

/// VFAT records for `long_name`, in on-disk order (highest sequence first).
pub fn lfn_entries(long_name: &str, short: &[u8; 11]) -> Vec<[u8; 32]> {
    const OFFSETS: [usize; 13] = [1, 3, 5, 7, 9, 14, 16, 18, 20, 22, 24, 28, 30];
    let mut units: Vec<u16> = long_name.encode_utf16().collect();
    if units.len() % 13 != 0 {
        units.push(0x0000);
        while units.len() % 13 != 0 {
            units.push(0xFFFF);
        }
    }
    let count = units.len() / 13;
    let checksum = lfn_checksum(short);

    let mut records = Vec::with_capacity(count);
    for seq in 1..=count {
        let mut e = [0u8; 32];
        e[0] = seq as u8 | if seq == count { 0x40 } else { 0 };
        e[11] = 0x0F;
        e[13] = checksum;
        let chunk = &units[(seq - 1) * 13..seq * 13];
        for (unit, &off) in chunk.iter().zip(OFFSETS.iter()) {
            e[off..off + 2].copy_from_slice(&unit.to_le_bytes());
        }
        records.push(e);
    }
    records.reverse();
    records
}
