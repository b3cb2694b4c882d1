//! Byte offsets of the control structures inside a region.
//!
//! [superblock][bitmap][used flags][inode table][data blocks...]
//!
//! Offsets are computed from structure sizes and the geometry, never stored.

use crate::config::*;
use crate::error::{FsError, Result};
use crate::structs::{INODE_SIZE, SUPERBLOCK_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub geometry: Geometry,
    pub bitmap_start: usize,
    pub used_start: usize,
    pub inode_table_start: usize,
    pub data_start: usize,
    pub total_len: usize,
}

impl Layout {
    pub const SUPERBLOCK_START: usize = 0;

    pub fn new(geometry: Geometry) -> Self {
        let block_count = geometry.block_count();
        let bitmap_start = Self::SUPERBLOCK_START + SUPERBLOCK_SIZE;
        let used_start = bitmap_start + block_count / 8;
        let inode_table_start = used_start + block_count * 4;
        let data_start = inode_table_start + geometry.inode_count * INODE_SIZE;
        let total_len = data_start + block_count * BLOCK_SIZE;
        Self {
            geometry,
            bitmap_start,
            used_start,
            inode_table_start,
            data_start,
            total_len,
        }
    }

    pub fn block_count(&self) -> usize {
        self.geometry.block_count()
    }

    pub fn inode_count(&self) -> usize {
        self.geometry.inode_count
    }

    /// Size of the allocator table: legacy bitmap plus used flags.
    pub fn alloc_table_len(&self) -> usize {
        self.inode_table_start - self.bitmap_start
    }

    pub fn used_flag_offset(&self, block_id: u32) -> Result<usize> {
        self.check_block(block_id)?;
        Ok(self.used_start + block_id as usize * 4)
    }

    pub fn inode_offset(&self, inode_id: u32) -> Result<usize> {
        if inode_id as usize >= self.inode_count() {
            return Err(FsError::InvalidInodeIndex(inode_id));
        }
        Ok(self.inode_table_start + inode_id as usize * INODE_SIZE)
    }

    pub fn block_offset(&self, block_id: u32) -> Result<usize> {
        self.check_block(block_id)?;
        Ok(self.data_start + block_id as usize * BLOCK_SIZE)
    }

    pub fn check_block(&self, block_id: u32) -> Result<()> {
        if block_id as usize >= self.block_count() {
            return Err(FsError::InvalidBlockIndex(block_id));
        }
        Ok(())
    }
}
