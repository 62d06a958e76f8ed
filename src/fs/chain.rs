use serde::Serialize;

use super::table::AllocationTable;
use crate::error::{FatError, Result};

/// Ordered clusters holding one file's or directory's data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClusterChain(Vec<u32>);

impl ClusterChain {
    pub fn clusters(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<u32> {
        self.0.first().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    /// Collapse consecutive clusters into inclusive `(start, end)` runs.
    pub fn runs(&self) -> Vec<(u32, u32)> {
        let mut runs: Vec<(u32, u32)> = Vec::new();
        for cluster in self.iter() {
            match runs.last_mut() {
                Some((_, end)) if end.checked_add(1) == Some(cluster) => *end = cluster,
                _ => runs.push((cluster, cluster)),
            }
        }
        runs
    }
}

impl From<Vec<u32>> for ClusterChain {
    fn from(clusters: Vec<u32>) -> Self {
        Self(clusters)
    }
}

/// Follow the links in `table` from `start`.
///
/// The chain always contains `start` (when valid) and every cluster reached
/// until a link value that is not a valid cluster number. An invalid start
/// yields an empty chain. Walking more links than the table has entries
/// means the chain loops, and a link past the end of the table points
/// nowhere; both are reported as `CorruptChain`.
pub fn resolve_chain(start: u32, table: &AllocationTable) -> Result<ClusterChain> {
    if !table.is_valid(start) {
        return Ok(ClusterChain::default());
    }

    let limit = table.len();
    let next = |cluster: u32, steps: usize| {
        table
            .get(cluster)
            .ok_or(FatError::CorruptChain { start, steps })
    };

    // Count first so the chain is allocated exactly once.
    let mut length = 1usize;
    let mut cluster = start;
    loop {
        let link = next(cluster, length)?;
        if !table.is_valid(link) {
            break;
        }
        length += 1;
        if length > limit {
            return Err(FatError::CorruptChain {
                start,
                steps: length,
            });
        }
        cluster = link;
    }

    let mut clusters = Vec::with_capacity(length);
    let mut cluster = start;
    clusters.push(cluster);
    while clusters.len() < length {
        cluster = next(cluster, clusters.len())?;
        clusters.push(cluster);
    }

    log::trace!("chain from {start}: {length} clusters");
    Ok(ClusterChain(clusters))
}
