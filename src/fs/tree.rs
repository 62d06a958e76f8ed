use std::collections::HashSet;

use super::boot_sector::BootSector;
use super::chain::{resolve_chain, ClusterChain};
use super::dir_entry::decode_directory;
use super::entry::{FileNode, NodeId};
use super::geometry::Geometry;
use super::table::AllocationTable;
use super::version::FatVersion;
use super::{InspectOptions, SortOrder};
use crate::device::SectorReader;
use crate::error::{FatError, Result};

/// Every node of a volume, stored flat. Index 0 is the root.
///
/// Children are owned by the arena, not by their parent; `FileNode::parent`
/// is only an index used to rebuild paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryTree {
    nodes: Vec<FileNode>,
}

impl DirectoryTree {
    pub const ROOT: NodeId = NodeId(0);

    fn with_root(root: FileNode) -> Self {
        Self { nodes: vec![root] }
    }

    fn push(&mut self, parent: NodeId, mut node: FileNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn root(&self) -> &FileNode {
        &self.nodes[Self::ROOT.0]
    }

    /// Look up a node. Ids handed out by this tree are always valid.
    pub fn node(&self, id: NodeId) -> &FileNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&FileNode> {
        self.nodes.get(id.0)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &FileNode)> + '_ {
        self.node(id)
            .children
            .iter()
            .map(move |&child| (child, self.node(child)))
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Ancestor names joined with '/'. The root contributes nothing, so the
    /// root itself is "" and its children are "/NAME".
    pub fn absolute_path(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current.and_then(|c| self.get(c)) {
            if node.parent.is_some() {
                names.push(node.name.as_str());
            }
            current = node.parent;
        }
        names.iter().rev().fold(String::new(), |mut path, name| {
            path.push('/');
            path.push_str(name);
            path
        })
    }

    /// Pre-order traversal from the root, children in stored order.
    pub fn walk(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        order
    }

    /// Resolve a '/'-separated path. Components match either the long or the
    /// short name, ignoring ASCII case as FAT does.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        path.split('/')
            .filter(|c| !c.is_empty())
            .try_fold(Self::ROOT, |dir, component| {
                self.children(dir)
                    .find(|(_, n)| {
                        n.name.eq_ignore_ascii_case(component)
                            || n.short_name.eq_ignore_ascii_case(component)
                    })
                    .map(|(id, _)| id)
            })
    }
}

/// Build the full tree with default options.
pub fn build_directory_tree<S: SectorReader>(
    boot: &BootSector,
    table: &AllocationTable,
    version: FatVersion,
    reader: &mut S,
) -> Result<DirectoryTree> {
    build_directory_tree_with(boot, table, version, reader, &InspectOptions::default())
}

/// Decode the root directory, then every subdirectory depth-first.
///
/// The walk keeps an explicit stack. A directory whose first cluster is
/// also the first cluster of one of its ancestors, one whose cluster was
/// already expanded elsewhere in the walk, or one nested deeper than
/// `options.max_depth` fails the whole build with `CorruptTree`.
pub fn build_directory_tree_with<S: SectorReader>(
    boot: &BootSector,
    table: &AllocationTable,
    version: FatVersion,
    reader: &mut S,
    options: &InspectOptions,
) -> Result<DirectoryTree> {
    let geometry = Geometry::new(boot, version)?;

    let (root_chain, root_bytes) = match version {
        FatVersion::Fat32 => {
            let chain = resolve_chain(geometry.root_cluster, table)?;
            if chain.is_empty() {
                log::warn!(
                    "root cluster {} is not a valid cluster; root directory is empty",
                    geometry.root_cluster
                );
            }
            let bytes = read_chain(&geometry, &chain, reader)?;
            (chain, bytes)
        }
        _ => {
            let offset = geometry.sector_offset(geometry.first_root_dir_sector()?);
            let bytes = reader.read_at(offset, geometry.root_dir_bytes() as usize)?;
            (ClusterChain::default(), bytes)
        }
    };

    // First clusters of every directory expanded so far, root included.
    let mut expanded: HashSet<u32> = root_chain.first().into_iter().collect();
    let mut tree = DirectoryTree::with_root(FileNode::root(root_chain));
    let mut stack: Vec<(NodeId, usize)> =
        populate(&mut tree, DirectoryTree::ROOT, &root_bytes, table, options)?
            .into_iter()
            .rev()
            .map(|id| (id, 1))
            .collect();

    while let Some((dir, depth)) = stack.pop() {
        let node = tree.node(dir);
        if depth > options.max_depth {
            return Err(FatError::CorruptTree {
                path: tree.absolute_path(dir),
                cluster: node.first_cluster,
            });
        }
        if revisits_ancestor(&tree, dir) {
            log::warn!(
                "directory {} points back at cluster {}",
                tree.absolute_path(dir),
                node.first_cluster
            );
            return Err(FatError::CorruptTree {
                path: tree.absolute_path(dir),
                cluster: node.first_cluster,
            });
        }
        if !expanded.insert(node.first_cluster) {
            log::warn!(
                "directory {} shares cluster {} with a directory already listed",
                tree.absolute_path(dir),
                node.first_cluster
            );
            return Err(FatError::CorruptTree {
                path: tree.absolute_path(dir),
                cluster: node.first_cluster,
            });
        }

        let bytes = read_chain(&geometry, &node.chain, reader)?;
        let subdirs = populate(&mut tree, dir, &bytes, table, options)?;
        stack.extend(subdirs.into_iter().rev().map(|id| (id, depth + 1)));
    }

    log::debug!("built directory tree with {} nodes", tree.len());
    Ok(tree)
}

/// Decode `bytes` as the contents of `dir`, attach the entries, and return
/// the children that need expanding.
fn populate(
    tree: &mut DirectoryTree,
    dir: NodeId,
    bytes: &[u8],
    table: &AllocationTable,
    options: &InspectOptions,
) -> Result<Vec<NodeId>> {
    let mut entries = decode_directory(bytes, table)?.entries;
    if options.sort == SortOrder::FilesFirst {
        entries.sort_by_key(|e| e.is_directory());
    }

    let mut subdirs = Vec::new();
    for entry in entries {
        let expand = entry.is_directory() && !entry.chain.is_empty();
        let id = tree.push(dir, entry);
        if expand {
            subdirs.push(id);
        }
    }
    Ok(subdirs)
}

fn revisits_ancestor(tree: &DirectoryTree, dir: NodeId) -> bool {
    let cluster = tree.node(dir).first_cluster;
    let mut ancestor = tree.parent(dir);
    while let Some(id) = ancestor {
        let node = tree.node(id);
        if !node.chain.is_empty() && node.first_cluster == cluster {
            return true;
        }
        ancestor = node.parent;
    }
    false
}

/// Read a chain's clusters into one buffer, one read per contiguous run.
fn read_chain<S: SectorReader>(
    geometry: &Geometry,
    chain: &ClusterChain,
    reader: &mut S,
) -> Result<Vec<u8>> {
    let cluster_size = geometry.cluster_size() as usize;
    let mut buf = Vec::with_capacity(chain.len() * cluster_size);
    for (start, end) in chain.runs() {
        let count = (end - start + 1) as usize;
        let offset = geometry.cluster_offset(start)?;
        buf.extend_from_slice(&reader.read_at(offset, count * cluster_size)?);
    }
    Ok(buf)
}
