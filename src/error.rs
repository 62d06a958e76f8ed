use thiserror::Error;

use crate::fs::version::FatVersion;

/// Errors surfaced by every stage of the decode pipeline.
///
/// Nothing in the library terminates the process; the caller decides which
/// of these are fatal.
#[derive(Error, Debug)]
pub enum FatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("short read at byte {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("{0} file systems are not supported")]
    UnsupportedVersion(FatVersion),

    #[error("cluster {cluster:#x} is not a valid {version} cluster number")]
    InvalidCluster { cluster: u32, version: FatVersion },

    #[error("corrupt cluster chain starting at cluster {start}: gave up after {steps} links")]
    CorruptChain { start: u32, steps: usize },

    #[error("corrupt directory tree at '{path}': cluster {cluster} revisited or nesting too deep")]
    CorruptTree { path: String, cluster: u32 },
}

pub type Result<T> = std::result::Result<T, FatError>;

impl FatError {
    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        FatError::Decode(msg.into())
    }
}
