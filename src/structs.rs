use core::fmt;

use bytemuck::{Pod, Zeroable};

use crate::config::*;
use crate::error::{FsError, Result};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct SuperBlock {
    pub block_size: u32,         // Fixed to BLOCK_SIZE
    pub region_size: u32,        // Bytes of data blocks in the segment
    pub inode_count: u32,        // Capacity of the inode table
    pub block_cursor: u32,       // Reserved, always 0
    pub blocks_per_segment: u32, // region_size / block_size
}

impl SuperBlock {
    pub fn new(geometry: &Geometry) -> Self {
        Self {
            block_size: BLOCK_SIZE as u32,
            region_size: geometry.region_size as u32,
            inode_count: geometry.inode_count as u32,
            block_cursor: 0,
            blocks_per_segment: geometry.block_count() as u32,
        }
    }

    pub fn matches(&self, geometry: &Geometry) -> bool {
        *self == Self::new(geometry)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Directory,
    Regular,
}

impl FileType {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            DIRECTORY => Some(Self::Directory),
            REGULAR_FILE => Some(Self::Regular),
            _ => None,
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            Self::Directory => DIRECTORY,
            Self::Regular => REGULAR_FILE,
        }
    }
}

/// Copies `name` into a NUL padded field, leaving room for the terminator.
fn encode_name<const N: usize>(name: &str) -> Result<[u8; N]> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() >= N || bytes.contains(&0) {
        return Err(FsError::InvalidName);
    }
    let mut field = [0u8; N];
    field[..bytes.len()].copy_from_slice(bytes);
    Ok(field)
}

pub fn trim_zero(name: &[u8]) -> &[u8] {
    let end = name.iter().position(|&c| c == 0).unwrap_or(name.len());
    &name[..end]
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct Inode {
    pub in_use: u32,
    pub ftype: u32,
    pub size: u32,
    pub direct_ptrs: [u32; NUM_DIRECT_PTRS],
    pub indirect: u32,
    pub dindirect: u32,
    pub tindirect: u32,
    pub name: [u8; NAME_LEN],
}

impl Inode {
    pub const NULL: Self = Self {
        in_use: 0,
        ftype: 0,
        size: 0,
        direct_ptrs: [0; NUM_DIRECT_PTRS],
        indirect: 0,
        dindirect: 0,
        tindirect: 0,
        name: [0; NAME_LEN],
    };

    pub fn new(ftype: FileType, size: u32, name: &str) -> Result<Self> {
        Ok(Self {
            in_use: 1,
            ftype: ftype.raw(),
            size,
            name: encode_name(name)?,
            ..Self::NULL
        })
    }

    pub fn is_used(&self) -> bool {
        self.in_use != 0
    }

    pub fn file_type(&self) -> Option<FileType> {
        FileType::from_raw(self.ftype)
    }

    pub fn is_dir(&self) -> bool {
        self.file_type() == Some(FileType::Directory)
    }

    pub fn name_bytes(&self) -> &[u8] {
        trim_zero(&self.name)
    }

    pub fn name(&self) -> String {
        String::from_utf8_lossy(self.name_bytes()).into_owned()
    }

    pub fn name_eq(&self, name: &str) -> bool {
        self.name_bytes() == name.as_bytes()
    }

    /// Number of direct blocks covering `size` bytes.
    pub fn num_blocks(&self) -> usize {
        blocks_for(self.size as u64)
    }

    /// Indices of the data blocks backing this inode, in file order.
    pub fn blocks(&self) -> &[u32] {
        &self.direct_ptrs[..self.num_blocks().min(NUM_DIRECT_PTRS)]
    }
}

impl fmt::Debug for Inode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inode")
            .field("in_use", &self.in_use)
            .field("ftype", &self.file_type())
            .field("size", &self.size)
            .field("blocks", &self.blocks())
            .field("name", &self.name())
            .finish()
    }
}

pub fn blocks_for(size: u64) -> usize {
    size.div_ceil(BLOCK_SIZE as u64) as usize
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct DirEntry {
    pub name: [u8; DIRENT_NAME_LEN],
    pub ftype: u32,
    pub inode_id: u32,
    pub in_use: u32,
}

impl DirEntry {
    pub const NULL: Self = Self {
        name: [0; DIRENT_NAME_LEN],
        ftype: 0,
        inode_id: 0,
        in_use: 0,
    };

    pub fn new(name: &str, ftype: FileType, inode_id: u32) -> Result<Self> {
        Ok(Self {
            name: encode_name(name)?,
            ftype: ftype.raw(),
            inode_id,
            in_use: 1,
        })
    }

    pub fn is_used(&self) -> bool {
        self.in_use != 0
    }

    pub fn file_type(&self) -> Option<FileType> {
        FileType::from_raw(self.ftype)
    }

    pub fn name_bytes(&self) -> &[u8] {
        trim_zero(&self.name)
    }

    pub fn name(&self) -> String {
        String::from_utf8_lossy(self.name_bytes()).into_owned()
    }

    pub fn name_eq(&self, name: &str) -> bool {
        self.name_bytes() == name.as_bytes()
    }
}

impl fmt::Debug for DirEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirEntry")
            .field("name", &self.name())
            .field("ftype", &self.file_type())
            .field("inode_id", &self.inode_id)
            .field("in_use", &self.in_use)
            .finish()
    }
}

pub const SUPERBLOCK_SIZE: usize = size_of::<SuperBlock>();
pub const INODE_SIZE: usize = size_of::<Inode>();
pub const DIR_ENTRY_SIZE: usize = size_of::<DirEntry>();
pub const NUM_ENTRY_PER_BLOCK: usize = BLOCK_SIZE / DIR_ENTRY_SIZE;

const _: () = assert!(SUPERBLOCK_SIZE == 20);
const _: () = assert!(INODE_SIZE == 5104);
const _: () = assert!(DIR_ENTRY_SIZE == 268);
