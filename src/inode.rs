//! Management of the inode table.
//!
//! Lookup is an exact match on the inode name, which holds the full path.
//! There is no component-wise resolution, so every stored name is a distinct key.

use log::{debug, trace};

use crate::error::{FsError, Result};
use crate::layout::Layout;
use crate::region::Region;
use crate::structs::Inode;

pub fn get_inode(region: &impl Region, layout: &Layout, inode_id: u32) -> Result<Inode> {
    region.read_at(layout.inode_offset(inode_id)?)
}

pub fn write_inode(
    region: &mut impl Region,
    layout: &Layout,
    inode_id: u32,
    inode: &Inode,
) -> Result<()> {
    region.write_at(layout.inode_offset(inode_id)?, inode)
}

/// Returns the first slot not in use. The slot is not marked; the caller writes
/// the whole record, in-use flag included, once it has one.
pub fn alloc_inode(region: &impl Region, layout: &Layout) -> Result<u32> {
    for inode_id in 0..layout.inode_count() as u32 {
        let in_use: u32 = region.read_at(layout.inode_offset(inode_id)?)?;
        if in_use == 0 {
            trace!("free inode slot {}", inode_id);
            return Ok(inode_id);
        }
    }
    Err(FsError::NoFreeInodes)
}

pub fn find_by_name(region: &impl Region, layout: &Layout, name: &str) -> Result<u32> {
    for inode_id in 0..layout.inode_count() as u32 {
        let inode = get_inode(region, layout, inode_id)?;
        if inode.is_used() && inode.name_eq(name) {
            return Ok(inode_id);
        }
    }
    Err(FsError::NotFound)
}

/// Releases a slot. The whole record is zeroed, not just the in-use flag.
pub fn release_inode(region: &mut impl Region, layout: &Layout, inode_id: u32) -> Result<()> {
    write_inode(region, layout, inode_id, &Inode::NULL)?;
    debug!("release inode {}", inode_id);
    Ok(())
}

/// Ids of in-use inodes, in table order.
pub fn used_inodes(region: &impl Region, layout: &Layout) -> Result<Vec<u32>> {
    let mut ids = Vec::new();
    for inode_id in 0..layout.inode_count() as u32 {
        let in_use: u32 = region.read_at(layout.inode_offset(inode_id)?)?;
        if in_use != 0 {
            ids.push(inode_id);
        }
    }
    Ok(ids)
}
