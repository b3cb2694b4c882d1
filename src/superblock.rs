use log::info;

use crate::config::Geometry;
use crate::error::{FsError, Result};
use crate::layout::Layout;
use crate::region::Region;
use crate::structs::SuperBlock;

pub fn read_superblock(region: &impl Region) -> Result<SuperBlock> {
    region.read_at(Layout::SUPERBLOCK_START)
}

pub fn write_superblock(region: &mut impl Region, superblock: &SuperBlock) -> Result<()> {
    region.write_at(Layout::SUPERBLOCK_START, superblock)
}

/// Writes a fresh superblock and zeroes the allocator table and every inode slot.
/// Data blocks are left untouched. Safe to repeat.
pub fn format_region(region: &mut impl Region, layout: &Layout) -> Result<SuperBlock> {
    if region.len() < layout.total_len {
        return Err(FsError::RegionTooSmall);
    }
    let superblock = SuperBlock::new(&layout.geometry);
    write_superblock(region, &superblock)?;
    region.fill(layout.bitmap_start, layout.alloc_table_len(), 0)?;
    region.fill(
        layout.inode_table_start,
        layout.data_start - layout.inode_table_start,
        0,
    )?;
    info!(
        "formatted segment: {} blocks, {} inodes, {} bytes",
        layout.block_count(),
        layout.inode_count(),
        layout.total_len
    );
    Ok(superblock)
}

/// Reads the superblock and checks it against the geometry the caller expects.
pub fn load_region(region: &impl Region, geometry: &Geometry) -> Result<(SuperBlock, Layout)> {
    let layout = Layout::new(*geometry);
    if region.len() < layout.total_len {
        return Err(FsError::RegionTooSmall);
    }
    let superblock = read_superblock(region)?;
    if !superblock.matches(geometry) {
        return Err(FsError::GeometryMismatch);
    }
    info!(
        "loaded segment: {} blocks, {} inodes",
        superblock.blocks_per_segment, superblock.inode_count
    );
    Ok((superblock, layout))
}
