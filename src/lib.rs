//! segfs is a single-segment file store living in one fixed-size region.
//! No journaling, permissions, timestamps, or indirect blocks.
//!
//! Region layout:
//! - Superblock
//! - Block allocator table (legacy bitmap + used flags)
//! - Inode table
//! - Data blocks
//!
//! Layers (from bottom to top):
//! 1. Region: the mapped bytes, with a bounds-checked record accessor.    | User supplied or `MappedRegion`
//! 2. Layout: offsets of every control structure.                        | Fs implemented
//! 3. Allocators: block flags and inode slots.                           | Fs implemented
//! 4. Directory: fixed entry slots in a directory's single block.        | Fs implemented
//! 5. FileSystem: import, export, delete, list over names.               | Fs implemented
//!
//! Names are full absolute paths and are matched exactly; the namespace is flat.
//! A directory is an inode named after its own path whose block lists the entries
//! below it, kept consistent by the file operations.

mod bitmap;
mod config;
mod directory;
mod error;
mod file;
mod fs;
mod host;
mod inode;
mod layout;
#[cfg(unix)]
mod mmap;
mod path;
mod region;
mod structs;
mod superblock;

pub use bitmap::*;
pub use config::*;
pub use directory::*;
pub use error::FsError as Error;
pub use error::Result;
pub use file::*;
pub use fs::*;
pub use host::*;
pub use inode::*;
pub use layout::*;
#[cfg(unix)]
pub use mmap::*;
pub use path::*;
pub use region::*;
pub use structs::*;
pub use superblock::*;
