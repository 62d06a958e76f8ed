use chrono::NaiveDateTime;
use serde::Serialize;

use super::chain::ClusterChain;

/// Index of a node inside a `DirectoryTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Directory,
}

pub const ATTR_READ_ONLY: u8 = 0x01;
pub const ATTR_HIDDEN: u8 = 0x02;
pub const ATTR_SYSTEM: u8 = 0x04;
pub const ATTR_VOLUME_ID: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;

/// A file or directory decoded from a FAT volume.
///
/// `parent` is a plain index and never owns anything; `children` lists the
/// node's entries in the order chosen when the tree was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    /// Long name when a VFAT sequence preceded the record, else the 8.3 name.
    pub name: String,
    /// The 8.3 name of the terminating short record.
    pub short_name: String,
    pub entry_type: EntryType,
    /// Byte size from the directory record (always 0 for directories).
    pub size: u64,
    pub attributes: u8,
    pub first_cluster: u32,
    pub chain: ClusterChain,
    pub modified: Option<NaiveDateTime>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl FileNode {
    /// The nameless root of a volume.
    pub fn root(chain: ClusterChain) -> Self {
        Self {
            name: String::new(),
            short_name: String::new(),
            entry_type: EntryType::Directory,
            size: 0,
            attributes: ATTR_DIRECTORY,
            first_cluster: chain.first().unwrap_or(0),
            chain,
            modified: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_read_only(&self) -> bool {
        self.attributes & ATTR_READ_ONLY != 0
    }

    pub fn is_hidden(&self) -> bool {
        self.attributes & ATTR_HIDDEN != 0
    }

    pub fn is_system(&self) -> bool {
        self.attributes & ATTR_SYSTEM != 0
    }

    pub fn is_archive(&self) -> bool {
        self.attributes & ATTR_ARCHIVE != 0
    }

    /// Attribute flags as the familiar `RHSA` column, `-` for unset bits.
    pub fn attribute_string(&self) -> String {
        [
            (self.is_read_only(), 'R'),
            (self.is_hidden(), 'H'),
            (self.is_system(), 'S'),
            (self.is_archive(), 'A'),
        ]
        .iter()
        .map(|&(set, c)| if set { c } else { '-' })
        .collect()
    }

    pub fn type_label(&self) -> &'static str {
        match self.entry_type {
            EntryType::File => "FILE",
            EntryType::Directory => "DIRECTORY",
        }
    }

    pub fn size_string(&self) -> String {
        if self.is_directory() {
            return String::new();
        }
        crate::report::format_size(self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, size: u64, chain: ClusterChain) -> FileNode {
        FileNode {
            name: name.to_string(),
            short_name: name.to_string(),
            entry_type: EntryType::File,
            size,
            attributes: 0,
            ..FileNode::root(chain)
        }
    }

    #[test]
    fn test_labels_and_sizes() {
        let file = file("A.TXT", 1536, vec![5u32, 6, 7].into());
        assert!(file.is_file());
        assert_eq!(file.first_cluster, 5);
        assert_eq!(file.size_string(), "1.5 KiB");
        assert_eq!(file.type_label(), "FILE");

        let root = FileNode::root(ClusterChain::default());
        assert!(root.is_directory());
        assert_eq!(root.parent, None);
        assert_eq!(root.name, "");
        assert_eq!(root.first_cluster, 0);
        assert_eq!(root.size_string(), "");
        assert_eq!(root.type_label(), "DIRECTORY");
    }

    #[test]
    fn test_attribute_string() {
        let mut file = file("IO.SYS", 0, ClusterChain::default());
        file.attributes = ATTR_READ_ONLY | ATTR_HIDDEN | ATTR_SYSTEM;
        assert_eq!(file.attribute_string(), "RHS-");
        file.attributes = ATTR_ARCHIVE;
        assert_eq!(file.attribute_string(), "---A");
    }
}
