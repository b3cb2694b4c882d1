//! Block allocation.
//! Each data block has a u32 used flag; the flag array is authoritative.
//! The legacy bitmap in front of it mirrors the flags bit for bit.

use log::{debug, trace};

use crate::error::{FsError, Result};
use crate::layout::Layout;
use crate::region::Region;

fn used_flags<'a>(region: &'a impl Region, layout: &Layout) -> Result<&'a [u8]> {
    region.slice(layout.used_start, layout.block_count() * 4)
}

fn set_used(region: &mut impl Region, layout: &Layout, block_id: u32, used: bool) -> Result<()> {
    let flag_offset = layout.used_flag_offset(block_id)?;
    region.write_at(flag_offset, &(used as u32))?;

    let byte_offset = layout.bitmap_start + block_id as usize / 8;
    let bit = 1u8 << (block_id % 8);
    let mut byte: u8 = region.read_at(byte_offset)?;
    if used {
        byte |= bit;
    } else {
        byte &= !bit;
    }
    region.write_at(byte_offset, &byte)
}

/// Marks the lowest free block used and returns its index.
pub fn alloc_block(region: &mut impl Region, layout: &Layout) -> Result<u32> {
    let free = used_flags(region, layout)?
        .chunks_exact(4)
        .position(|flag| flag.iter().all(|&b| b == 0));
    let Some(block_id) = free else {
        trace!("block scan exhausted {} slots", layout.block_count());
        return Err(FsError::NoFreeBlocks);
    };
    let block_id = block_id as u32;
    set_used(region, layout, block_id, true)?;
    debug!("alloc block {}", block_id);
    Ok(block_id)
}

/// Marks a block free. Freeing a block that is already free is not detected.
pub fn free_block(region: &mut impl Region, layout: &Layout, block_id: u32) -> Result<()> {
    set_used(region, layout, block_id, false)?;
    debug!("free block {}", block_id);
    Ok(())
}

pub fn is_block_used(region: &impl Region, layout: &Layout, block_id: u32) -> Result<bool> {
    let flag: u32 = region.read_at(layout.used_flag_offset(block_id)?)?;
    Ok(flag != 0)
}

pub fn count_free_blocks(region: &impl Region, layout: &Layout) -> Result<usize> {
    Ok(used_flags(region, layout)?
        .chunks_exact(4)
        .filter(|flag| flag.iter().all(|&b| b == 0))
        .count())
}
