use std::io;

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("no free inodes")]
    NoFreeInodes,
    #[error("no free blocks")]
    NoFreeBlocks,
    #[error("insufficient free blocks for file")]
    InsufficientSpace,
    #[error("not found")]
    NotFound,
    #[error("is a directory")]
    IsDirectory,
    #[error("not a directory")]
    NotDirectory,
    #[error("directory full")]
    DirectoryFull,
    #[error("directory not empty")]
    DirectoryNotEmpty,
    #[error("already exists")]
    AlreadyExists,
    #[error("invalid name")]
    InvalidName,
    #[error("file too large for direct blocks")]
    FileTooLarge,
    #[error("invalid block index {0}")]
    InvalidBlockIndex(u32),
    #[error("invalid inode index {0}")]
    InvalidInodeIndex(u32),
    #[error("access outside of region")]
    OutOfBounds,
    #[error("superblock does not match expected geometry")]
    GeometryMismatch,
    #[error("invalid geometry")]
    InvalidGeometry,
    #[error("region too small for layout")]
    RegionTooSmall,
    #[error("mapping failed: {0}")]
    MapFailed(#[source] io::Error),
    #[error("error reading source: {0}")]
    SourceReadError(#[source] io::Error),
    #[error("error writing destination: {0}")]
    DestWriteError(#[source] io::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = core::result::Result<T, FsError>;
