pub mod boot_sector;
pub mod chain;
pub mod dir_entry;
pub mod entry;
pub mod fat;
pub mod geometry;
pub mod le;
pub mod table;
pub mod tree;
pub mod version;

#[cfg(test)]
pub(crate) mod test_image;

use std::path::Path;

pub use boot_sector::{decode_boot_sector, BootSector};
pub use chain::{resolve_chain, ClusterChain};
pub use entry::{EntryType, FileNode, NodeId};
pub use fat::{FatVolume, VolumeInfo};
pub use table::{decode_allocation_table, AllocationTable};
pub use tree::{build_directory_tree, build_directory_tree_with, DirectoryTree};
pub use version::{classify_version, FatVersion};

use crate::device::{ImageReader, SectorReader};
use crate::error::Result;

/// Default cap on directory nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Order of a directory's children in the built tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Record order on disk.
    #[default]
    OnDisk,
    /// Files before subdirectories, each group in record order.
    FilesFirst,
}

/// Knobs for building a directory tree.
#[derive(Debug, Clone)]
pub struct InspectOptions {
    pub max_depth: usize,
    pub sort: SortOrder,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            sort: SortOrder::OnDisk,
        }
    }
}

/// Everything decoded from one image.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub info: VolumeInfo,
    pub boot_sector: BootSector,
    pub tree: DirectoryTree,
}

/// Run the whole pipeline over any sector source.
pub fn inspect<S: SectorReader>(
    reader: S,
    device: &str,
    options: &InspectOptions,
) -> Result<Inspection> {
    let mut volume = FatVolume::open(reader)?;
    let info = volume.info(device)?;
    let tree = volume.directory_tree_with(options)?;
    Ok(Inspection {
        info,
        boot_sector: volume.boot_sector().clone(),
        tree,
    })
}

/// Open an image file (or block device) read-only and inspect it.
pub fn inspect_image(path: impl AsRef<Path>, options: &InspectOptions) -> Result<Inspection> {
    let path = path.as_ref();
    log::debug!("inspecting {}", path.display());
    let reader = ImageReader::open(path)?;
    inspect(reader, &path.display().to_string(), options)
}
