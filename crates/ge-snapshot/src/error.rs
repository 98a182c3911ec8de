use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SnapshotError>;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("out of memory allocating {len} entries")]
    OutOfMemory { len: usize },

    #[error("invalid snapshot magic")]
    InvalidMagic,

    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u16),

    #[error("invalid endianness tag {0}")]
    InvalidEndianness(u8),

    #[error("corrupt snapshot: {0}")]
    Corrupt(&'static str),

    #[error("display list id {0} appears more than once")]
    DuplicateListId(u32),

    #[error("display list {id} has {depth} stack entries (capacity {capacity})")]
    StackTooDeep {
        id: u32,
        depth: usize,
        capacity: usize,
    },
}
