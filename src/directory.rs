//! Directory entries inside a directory's single entry block.
//! Entries are packed from the start of the block; a cleared entry leaves a hole that the next insert reuses.

use log::{debug, trace};

use crate::config::BLOCK_SIZE;
use crate::error::{FsError, Result};
use crate::layout::Layout;
use crate::region::Region;
use crate::structs::*;

fn entry_offset(layout: &Layout, block_id: u32, slot: usize) -> Result<usize> {
    if slot >= NUM_ENTRY_PER_BLOCK {
        return Err(FsError::OutOfBounds);
    }
    Ok(layout.block_offset(block_id)? + slot * DIR_ENTRY_SIZE)
}

pub fn read_entry(region: &impl Region, layout: &Layout, block_id: u32, slot: usize) -> Result<DirEntry> {
    region.read_at(entry_offset(layout, block_id, slot)?)
}

fn write_entry(
    region: &mut impl Region,
    layout: &Layout,
    block_id: u32,
    slot: usize,
    entry: &DirEntry,
) -> Result<()> {
    region.write_at(entry_offset(layout, block_id, slot)?, entry)
}

/// Prepares a freshly allocated block to hold entries.
pub fn init_dir_block(region: &mut impl Region, layout: &Layout, block_id: u32) -> Result<()> {
    region.fill(layout.block_offset(block_id)?, BLOCK_SIZE, 0)
}

/// Finds the slot of the in-use entry called `name`.
pub fn find_entry(region: &impl Region, layout: &Layout, block_id: u32, name: &str) -> Result<usize> {
    for slot in 0..NUM_ENTRY_PER_BLOCK {
        let entry = read_entry(region, layout, block_id, slot)?;
        if entry.is_used() && entry.name_eq(name) {
            trace!("entry {} found in block {} slot {}", name, block_id, slot);
            return Ok(slot);
        }
    }
    Err(FsError::NotFound)
}

pub fn clear_entry(region: &mut impl Region, layout: &Layout, block_id: u32, slot: usize) -> Result<()> {
    write_entry(region, layout, block_id, slot, &DirEntry::NULL)?;
    debug!("cleared entry slot {} of block {}", slot, block_id);
    Ok(())
}

/// Stores `entry` in the first unused slot and returns that slot.
pub fn add_entry(region: &mut impl Region, layout: &Layout, block_id: u32, entry: &DirEntry) -> Result<usize> {
    let mut hole = None;
    for slot in 0..NUM_ENTRY_PER_BLOCK {
        let existing = read_entry(region, layout, block_id, slot)?;
        if !existing.is_used() {
            hole.get_or_insert(slot);
        } else if existing.name_bytes() == entry.name_bytes() {
            return Err(FsError::AlreadyExists);
        }
    }
    let slot = hole.ok_or(FsError::DirectoryFull)?;
    write_entry(region, layout, block_id, slot, entry)?;
    debug!("added entry {} to block {} slot {}", entry.name(), block_id, slot);
    Ok(slot)
}

/// In-use entries of a directory block with their slots.
pub fn read_dir(region: &impl Region, layout: &Layout, block_id: u32) -> Result<Vec<(usize, DirEntry)>> {
    let mut entries = Vec::new();
    for slot in 0..NUM_ENTRY_PER_BLOCK {
        let entry = read_entry(region, layout, block_id, slot)?;
        if entry.is_used() {
            entries.push((slot, entry));
        }
    }
    Ok(entries)
}

pub fn dir_is_empty(region: &impl Region, layout: &Layout, block_id: u32) -> Result<bool> {
    for slot in 0..NUM_ENTRY_PER_BLOCK {
        if read_entry(region, layout, block_id, slot)?.is_used() {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Geometry;
    use crate::region::MemRegion;

    fn setup() -> (MemRegion, Layout) {
        let layout = Layout::new(Geometry::new(BLOCK_SIZE * 8, 2).unwrap());
        let region = MemRegion::new(layout.total_len);
        (region, layout)
    }

    fn entry(name: &str, inode: u32) -> DirEntry {
        DirEntry::new(name, FileType::Regular, inode).unwrap()
    }

    #[test]
    fn test_add_find_clear() {
        let (mut region, layout) = setup();
        init_dir_block(&mut region, &layout, 3).unwrap();
        assert_eq!(add_entry(&mut region, &layout, 3, &entry("a", 1)).unwrap(), 0);
        assert_eq!(add_entry(&mut region, &layout, 3, &entry("b", 2)).unwrap(), 1);
        assert_eq!(find_entry(&region, &layout, 3, "b").unwrap(), 1);

        clear_entry(&mut region, &layout, 3, 0).unwrap();
        assert!(matches!(find_entry(&region, &layout, 3, "a"), Err(FsError::NotFound)));
        // The hole at slot 0 is reused.
        assert_eq!(add_entry(&mut region, &layout, 3, &entry("c", 3)).unwrap(), 0);
        let names: Vec<_> = read_dir(&region, &layout, 3)
            .unwrap()
            .into_iter()
            .map(|(_, e)| e.name())
            .collect();
        assert_eq!(names, vec!["c", "b"]);
    }

    #[test]
    fn test_duplicate_name() {
        let (mut region, layout) = setup();
        add_entry(&mut region, &layout, 0, &entry("a", 1)).unwrap();
        assert!(matches!(add_entry(&mut region, &layout, 0, &entry("a", 2)), Err(FsError::AlreadyExists)));
    }

    #[test]
    fn test_directory_full() {
        let (mut region, layout) = setup();
        for i in 0..NUM_ENTRY_PER_BLOCK {
            add_entry(&mut region, &layout, 1, &entry(&format!("f{}", i), i as u32)).unwrap();
        }
        assert!(matches!(add_entry(&mut region, &layout, 1, &entry("extra", 99)), Err(FsError::DirectoryFull)));
        assert!(!dir_is_empty(&region, &layout, 1).unwrap());
    }

    #[test]
    fn test_slot_bounds() {
        let (region, layout) = setup();
        assert!(matches!(read_entry(&region, &layout, 0, NUM_ENTRY_PER_BLOCK), Err(FsError::OutOfBounds)));
        assert!(dir_is_empty(&region, &layout, 0).unwrap());
    }
}
