//! Text and JSON rendering of an inspected volume.

use std::io::{self, Write};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::fs::{BootSector, ClusterChain, DirectoryTree, Inspection, NodeId, VolumeInfo};

pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    const GIB: u64 = 1024 * MIB;
    const TIB: u64 = 1024 * GIB;

    if bytes >= TIB {
        format!("{:.1} TiB", bytes as f64 / TIB as f64)
    } else if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Render a chain as comma-separated runs, e.g. `2-4, 9`.
pub fn format_clusters(chain: &ClusterChain) -> String {
    if chain.is_empty() {
        return "-".to_string();
    }
    chain
        .runs()
        .iter()
        .map(|&(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start}-{end}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// The file system information block.
pub fn write_volume_info<W: Write>(out: &mut W, info: &VolumeInfo) -> io::Result<()> {
    writeln!(out, "File system information")?;
    writeln!(out, "  Device:                 {}", info.device)?;
    writeln!(out, "  FAT version:            {}", info.version)?;
    writeln!(out, "  OEM name:               {}", info.oem_name)?;
    writeln!(out, "  File system type:       {}", info.fs_type)?;
    writeln!(
        out,
        "  Volume label:           {}",
        info.volume_label.as_deref().unwrap_or("(none)")
    )?;
    writeln!(out, "  Volume serial:          {:08X}", info.volume_serial)?;
    writeln!(
        out,
        "  Capacity:               {} ({} bytes)",
        format_size(info.capacity_bytes),
        info.capacity_bytes
    )?;
    writeln!(out, "  Bytes per sector:       {}", info.bytes_per_sector)?;
    writeln!(out, "  Sectors per cluster:    {}", info.sectors_per_cluster)?;
    writeln!(out, "  Root directory entries: {}", info.root_entries)?;
    writeln!(out, "  Sectors per FAT:        {}", info.sectors_per_fat)?;
    writeln!(out, "  Reserved sectors:       {}", info.reserved_sectors)?;
    writeln!(out, "  Hidden sectors:         {}", info.hidden_sectors)?;
    writeln!(out, "  First FAT sector:       {}", info.first_fat_sector)?;
    writeln!(out, "  First root dir sector:  {}", info.first_root_dir_sector)?;
    writeln!(out, "  First data sector:      {}", info.first_data_sector)?;
    writeln!(
        out,
        "  Clusters in use:        {} of {}",
        info.used_clusters, info.data_clusters
    )?;
    Ok(())
}

/// List the contents of `dir`: its files first, then its subdirectories.
/// With `recursive`, each subdirectory's listing follows its own line.
pub fn write_directory<W: Write>(
    out: &mut W,
    tree: &DirectoryTree,
    dir: NodeId,
    recursive: bool,
) -> io::Result<()> {
    // (directory, next child index to consider, files already written)
    let mut stack: Vec<(NodeId, usize, bool)> = vec![(dir, 0, false)];

    while let Some((current, next, files_done)) = stack.pop() {
        if !files_done {
            for (id, node) in tree.children(current) {
                if node.is_file() {
                    write_node_line(out, tree, id)?;
                }
            }
        }

        let children = &tree.node(current).children;
        let subdir = children
            .iter()
            .enumerate()
            .skip(next)
            .find(|&(_, &id)| tree.node(id).is_directory());
        if let Some((index, &id)) = subdir {
            write_node_line(out, tree, id)?;
            stack.push((current, index + 1, true));
            if recursive {
                stack.push((id, 0, false));
            }
        }
    }
    Ok(())
}

fn write_node_line<W: Write>(out: &mut W, tree: &DirectoryTree, id: NodeId) -> io::Result<()> {
    let node = tree.node(id);
    writeln!(
        out,
        "{:<9} {:>10}  {}  {}  [{}]",
        node.type_label(),
        node.size_string(),
        node.attribute_string(),
        tree.absolute_path(id),
        format_clusters(&node.chain)
    )
}

/// Full text report: the information block followed by the listing.
pub fn write_report<W: Write>(
    out: &mut W,
    inspection: &Inspection,
    recursive: bool,
) -> io::Result<()> {
    write_volume_info(out, &inspection.info)?;
    writeln!(out)?;
    writeln!(out, "Drive contents")?;
    write_directory(out, &inspection.tree, DirectoryTree::ROOT, recursive)
}

#[derive(Serialize)]
struct JsonReport<'a> {
    volume: &'a VolumeInfo,
    boot_sector: &'a BootSector,
    root: JsonNode<'a>,
}

#[derive(Serialize)]
struct JsonNode<'a> {
    path: String,
    name: &'a str,
    short_name: &'a str,
    #[serde(rename = "type")]
    entry_type: crate::fs::EntryType,
    size: u64,
    attributes: String,
    modified: Option<NaiveDateTime>,
    clusters: &'a ClusterChain,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<JsonNode<'a>>,
}

fn json_node<'a>(tree: &'a DirectoryTree, id: NodeId, recursive: bool) -> JsonNode<'a> {
    let node = tree.node(id);
    let expand = recursive || id == DirectoryTree::ROOT;
    JsonNode {
        path: tree.absolute_path(id),
        name: &node.name,
        short_name: &node.short_name,
        entry_type: node.entry_type,
        size: node.size,
        attributes: node.attribute_string(),
        modified: node.modified,
        clusters: &node.chain,
        children: if expand {
            node.children
                .iter()
                .map(|&child| json_node(tree, child, recursive))
                .collect()
        } else {
            Vec::new()
        },
    }
}

/// Pretty-printed JSON of the volume info, boot sector and tree.
pub fn write_json<W: Write>(
    out: &mut W,
    inspection: &Inspection,
    recursive: bool,
) -> serde_json::Result<()> {
    let report = JsonReport {
        volume: &inspection.info,
        boot_sector: &inspection.boot_sector,
        root: json_node(&inspection.tree, DirectoryTree::ROOT, recursive),
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out).map_err(serde_json::Error::io)
}
