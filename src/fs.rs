use std::io::{self, Read};
use std::path::Path;

use log::{debug, info, trace, warn};

use crate::bitmap::{alloc_block, count_free_blocks, free_block};
use crate::config::*;
use crate::directory::{
    add_entry, clear_entry, dir_is_empty, find_entry, init_dir_block, read_dir, read_entry,
};
use crate::error::{FsError, Result};
use crate::file::{copy_in, copy_out, read_at};
use crate::host::{HostIo, StdHost};
use crate::inode::{alloc_inode, find_by_name, get_inode, release_inode, used_inodes, write_inode};
use crate::layout::Layout;
use crate::path::{join, split, validate};
use crate::region::Region;
use crate::structs::*;
use crate::superblock::{format_region, load_region};

/// Work done by a multi-step operation, undone in reverse if a later step fails.
#[derive(Debug)]
enum Undo {
    Block(u32),
    Inode(u32),
    Entry { block_id: u32, slot: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub free_blocks: usize,
    pub used_blocks: usize,
    pub free_inodes: usize,
    pub used_inodes: usize,
}

/// One row of a listing: an entry `name` found in directory `dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub dir: String,
    pub name: String,
    pub ftype: FileType,
    pub inode_id: u32,
}

/// A single segment living in `region`.
/// The region is the working view: every operation reads and writes it directly.
#[derive(Debug)]
pub struct FileSystem<R: Region> {
    region: R,
    layout: Layout,
    superblock: SuperBlock,
}

impl<R: Region> FileSystem<R> {
    /// Formats `region` with `geometry` and opens it.
    pub fn format(mut region: R, geometry: Geometry) -> Result<Self> {
        let layout = Layout::new(geometry);
        let superblock = format_region(&mut region, &layout)?;
        Ok(Self {
            region,
            layout,
            superblock,
        })
    }

    /// Opens a region previously formatted with `geometry`.
    pub fn load(region: R, geometry: Geometry) -> Result<Self> {
        let (superblock, layout) = load_region(&region, &geometry)?;
        Ok(Self {
            region,
            layout,
            superblock,
        })
    }

    /// Clears every inode and block allocation. Repeating it is harmless.
    pub fn reformat(&mut self) -> Result<()> {
        self.superblock = format_region(&mut self.region, &self.layout)?;
        Ok(())
    }

    // Following methods directly operate on the region; callers serialize access.

    pub fn allocate_block(&mut self) -> Result<u32> {
        alloc_block(&mut self.region, &self.layout)
    }

    pub fn free_block(&mut self, block_id: u32) -> Result<()> {
        free_block(&mut self.region, &self.layout, block_id)
    }

    pub fn allocate_inode(&self) -> Result<u32> {
        alloc_inode(&self.region, &self.layout)
    }

    pub fn release_inode(&mut self, inode_id: u32) -> Result<()> {
        release_inode(&mut self.region, &self.layout, inode_id)
    }

    pub fn find_by_name(&self, name: &str) -> Result<u32> {
        find_by_name(&self.region, &self.layout, name)
    }

    pub fn get_inode(&self, inode_id: u32) -> Result<Inode> {
        get_inode(&self.region, &self.layout, inode_id)
    }

    pub fn find_entry(&self, block_id: u32, name: &str) -> Result<usize> {
        find_entry(&self.region, &self.layout, block_id, name)
    }

    pub fn clear_entry(&mut self, block_id: u32, slot: usize) -> Result<()> {
        clear_entry(&mut self.region, &self.layout, block_id, slot)
    }

    /// Copies the host file at `host_path` into the store under `name`.
    /// Missing parent directories are created. Returns the new inode id.
    pub fn import(&mut self, host_path: impl AsRef<Path>, name: &str) -> Result<u32> {
        self.import_with(&StdHost, host_path.as_ref(), name)
    }

    pub fn import_with<H: HostIo>(&mut self, host: &H, host_path: &Path, name: &str) -> Result<u32> {
        if !host.exists(host_path) {
            return Err(FsError::SourceReadError(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", host_path.display()),
            )));
        }
        let size = host.file_size(host_path).map_err(FsError::SourceReadError)?;
        let mut reader = host.open_read(host_path).map_err(FsError::SourceReadError)?;
        let inode_id = self.store(name, size, &mut reader)?;
        info!("imported {} as {} ({} bytes)", host_path.display(), name, size);
        Ok(inode_id)
    }

    /// Stores `data` under `name`, like `import` without the host side.
    pub fn write_file(&mut self, name: &str, data: &[u8]) -> Result<u32> {
        let mut reader = data;
        self.store(name, data.len() as u64, &mut reader)
    }

    /// Writes the file `name` to `dest_path` on the host, creating or truncating it.
    /// A failed write leaves a partial destination behind.
    pub fn export(&self, name: &str, dest_path: impl AsRef<Path>) -> Result<u64> {
        self.export_with(&StdHost, name, dest_path.as_ref())
    }

    pub fn export_with<H: HostIo>(&self, host: &H, name: &str, dest_path: &Path) -> Result<u64> {
        let (_, inode) = self.file_inode(name)?;
        let mut writer = host.open_write(dest_path).map_err(FsError::DestWriteError)?;
        let written = copy_out(&self.region, &self.layout, &inode, &mut writer)?;
        info!("exported {} to {} ({} bytes)", name, dest_path.display(), written);
        Ok(written)
    }

    /// Removes the regular file `name`, its blocks and its entry in the parent directory.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let (inode_id, inode) = self.file_inode(name)?;
        for &block_id in inode.blocks() {
            self.layout.check_block(block_id)?;
        }
        self.unlink(name, inode_id)?;
        for &block_id in inode.blocks() {
            free_block(&mut self.region, &self.layout, block_id)?;
        }
        release_inode(&mut self.region, &self.layout, inode_id)?;
        info!("deleted {} (inode {}, {} blocks)", name, inode_id, inode.num_blocks());
        Ok(())
    }

    /// Creates the directory `name` and any missing parents.
    pub fn mkdir(&mut self, name: &str) -> Result<u32> {
        validate(name)?;
        if self.find_by_name(name).is_ok() {
            return Err(FsError::AlreadyExists);
        }
        let mut undo = Vec::new();
        match self.ensure_dir(name, &mut undo) {
            Ok(inode_id) => Ok(inode_id),
            Err(e) => {
                self.rollback(undo);
                Err(e)
            }
        }
    }

    /// Removes the empty directory `name`.
    pub fn remove_dir(&mut self, name: &str) -> Result<()> {
        let inode_id = self.find_by_name(name)?;
        let inode = self.get_inode(inode_id)?;
        if !inode.is_dir() {
            return Err(FsError::NotDirectory);
        }
        let block_id = inode.direct_ptrs[0];
        if !dir_is_empty(&self.region, &self.layout, block_id)? {
            return Err(FsError::DirectoryNotEmpty);
        }
        self.unlink(name, inode_id)?;
        free_block(&mut self.region, &self.layout, block_id)?;
        release_inode(&mut self.region, &self.layout, inode_id)?;
        info!("removed directory {}", name);
        Ok(())
    }

    /// Live entries of the directory `name`.
    pub fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>> {
        let inode_id = self.find_by_name(name)?;
        let inode = self.get_inode(inode_id)?;
        if !inode.is_dir() {
            return Err(FsError::NotDirectory);
        }
        Ok(read_dir(&self.region, &self.layout, inode.direct_ptrs[0])?
            .into_iter()
            .map(|(_, entry)| entry)
            .collect())
    }

    /// Every entry of every directory, directory by directory in inode order.
    pub fn list(&self) -> Listing<'_, R> {
        Listing {
            fs: self,
            inode_id: 0,
            slot: 0,
            current: None,
        }
    }

    /// Names of all directories, in inode order.
    pub fn directories(&self) -> Result<Vec<String>> {
        let mut dirs = Vec::new();
        for inode_id in used_inodes(&self.region, &self.layout)? {
            let inode = self.get_inode(inode_id)?;
            if inode.is_dir() && self.layout.check_block(inode.direct_ptrs[0]).is_ok() {
                dirs.push(inode.name());
            }
        }
        Ok(dirs)
    }

    pub fn stat(&self, name: &str) -> Result<Inode> {
        self.get_inode(self.find_by_name(name)?)
    }

    pub fn lookup(&self, name: &str) -> Result<(u32, FileType)> {
        let inode_id = self.find_by_name(name)?;
        let ftype = self
            .get_inode(inode_id)?
            .file_type()
            .ok_or(FsError::NotFound)?;
        Ok((inode_id, ftype))
    }

    pub fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let (_, inode) = self.file_inode(name)?;
        let mut data = Vec::with_capacity(inode.size as usize);
        copy_out(&self.region, &self.layout, &inode, &mut data)?;
        Ok(data)
    }

    pub fn read_at(&self, name: &str, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let (_, inode) = self.file_inode(name)?;
        read_at(&self.region, &self.layout, &inode, offset, buf)
    }

    pub fn usage(&self) -> Result<Usage> {
        let free_blocks = count_free_blocks(&self.region, &self.layout)?;
        let used_inodes = used_inodes(&self.region, &self.layout)?.len();
        Ok(Usage {
            free_blocks,
            used_blocks: self.layout.block_count() - free_blocks,
            free_inodes: self.layout.inode_count() - used_inodes,
            used_inodes,
        })
    }

    pub fn dump(&self) -> String {
        let mut out = format!(
            "segment: block size {}, {} blocks, {} inodes, data at {:#x}, {} bytes mapped",
            self.superblock.block_size,
            self.superblock.blocks_per_segment,
            self.superblock.inode_count,
            self.layout.data_start,
            self.layout.total_len,
        );
        if let Ok(usage) = self.usage() {
            out.push_str(&format!(
                "\n  blocks used {}/{}, inodes used {}/{}",
                usage.used_blocks,
                self.layout.block_count(),
                usage.used_inodes,
                self.layout.inode_count(),
            ));
        }
        if let Ok(ids) = used_inodes(&self.region, &self.layout) {
            for id in ids {
                if let Ok(inode) = self.get_inode(id) {
                    out.push_str(&format!("\n  [{}] {:?}", id, inode));
                }
            }
        }
        out
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn region(&self) -> &R {
        &self.region
    }

    pub fn flush(&mut self) -> Result<()> {
        self.region.flush()
    }

    pub fn into_region(self) -> R {
        self.region
    }

    /// Resolves `name` to a regular file.
    fn file_inode(&self, name: &str) -> Result<(u32, Inode)> {
        let inode_id = self.find_by_name(name)?;
        let inode = self.get_inode(inode_id)?;
        if inode.is_dir() {
            return Err(FsError::IsDirectory);
        }
        Ok((inode_id, inode))
    }

    fn store(&mut self, name: &str, size: u64, reader: &mut impl Read) -> Result<u32> {
        validate(name)?;
        if split(name).is_none() {
            return Err(FsError::InvalidName);
        }
        if size > u32::MAX as u64 || blocks_for(size) > NUM_DIRECT_PTRS {
            return Err(FsError::FileTooLarge);
        }
        if self.find_by_name(name).is_ok() {
            return Err(FsError::AlreadyExists);
        }

        let mut undo = Vec::new();
        match self.store_steps(name, size, reader, &mut undo) {
            Ok(inode_id) => Ok(inode_id),
            Err(e) => {
                warn!("storing {} failed: {}, rolling back {} steps", name, e, undo.len());
                self.rollback(undo);
                match e {
                    FsError::NoFreeBlocks => Err(FsError::InsufficientSpace),
                    e => Err(e),
                }
            }
        }
    }

    fn store_steps(
        &mut self,
        name: &str,
        size: u64,
        reader: &mut impl Read,
        undo: &mut Vec<Undo>,
    ) -> Result<u32> {
        let (parent, base) = split(name).ok_or(FsError::InvalidName)?;
        let parent_id = self.ensure_dir(parent, undo)?;

        let inode_id = alloc_inode(&self.region, &self.layout)?;
        let mut inode = Inode::new(FileType::Regular, size as u32, name)?;
        write_inode(&mut self.region, &self.layout, inode_id, &inode)?;
        undo.push(Undo::Inode(inode_id));

        let num_blocks = blocks_for(size);
        for i in 0..num_blocks {
            let block_id = alloc_block(&mut self.region, &self.layout)?;
            undo.push(Undo::Block(block_id));
            inode.direct_ptrs[i] = block_id;
        }
        copy_in(
            &mut self.region,
            &self.layout,
            &inode.direct_ptrs[..num_blocks],
            size,
            reader,
        )?;
        write_inode(&mut self.region, &self.layout, inode_id, &inode)?;

        self.link(parent_id, base, FileType::Regular, inode_id, undo)?;
        debug!("stored {} in inode {} over {} blocks", name, inode_id, num_blocks);
        Ok(inode_id)
    }

    /// Returns the directory called `name`, creating it and its parents when missing.
    fn ensure_dir(&mut self, name: &str, undo: &mut Vec<Undo>) -> Result<u32> {
        match self.find_by_name(name) {
            Ok(inode_id) => {
                if !self.get_inode(inode_id)?.is_dir() {
                    return Err(FsError::NotDirectory);
                }
                Ok(inode_id)
            }
            Err(FsError::NotFound) => {
                let parent = match split(name) {
                    Some((parent, base)) => Some((self.ensure_dir(parent, undo)?, base)),
                    None => None,
                };

                let inode_id = alloc_inode(&self.region, &self.layout)?;
                let mut inode = Inode::new(FileType::Directory, BLOCK_SIZE as u32, name)?;
                write_inode(&mut self.region, &self.layout, inode_id, &inode)?;
                undo.push(Undo::Inode(inode_id));

                let block_id = alloc_block(&mut self.region, &self.layout)?;
                undo.push(Undo::Block(block_id));
                init_dir_block(&mut self.region, &self.layout, block_id)?;
                inode.direct_ptrs[0] = block_id;
                write_inode(&mut self.region, &self.layout, inode_id, &inode)?;

                if let Some((parent_id, base)) = parent {
                    self.link(parent_id, base, FileType::Directory, inode_id, undo)?;
                }
                debug!("created directory {} (inode {}, block {})", name, inode_id, block_id);
                Ok(inode_id)
            }
            Err(e) => Err(e),
        }
    }

    /// Adds an entry for `child_id` to the directory `parent_id`.
    fn link(
        &mut self,
        parent_id: u32,
        base: &str,
        ftype: FileType,
        child_id: u32,
        undo: &mut Vec<Undo>,
    ) -> Result<()> {
        let parent = self.get_inode(parent_id)?;
        if !parent.is_dir() {
            return Err(FsError::NotDirectory);
        }
        let block_id = parent.direct_ptrs[0];
        if let Ok(slot) = find_entry(&self.region, &self.layout, block_id, base) {
            let stale = read_entry(&self.region, &self.layout, block_id, slot)?;
            if stale.inode_id == child_id || !self.entry_is_live(&parent.name(), &stale) {
                warn!("reclaiming dangling entry {} in {}", base, parent.name());
                clear_entry(&mut self.region, &self.layout, block_id, slot)?;
            }
        }
        let entry = DirEntry::new(base, ftype, child_id)?;
        let slot = add_entry(&mut self.region, &self.layout, block_id, &entry)?;
        undo.push(Undo::Entry { block_id, slot });
        Ok(())
    }

    /// Clears the entry for `name` in its parent directory if it refers to `inode_id`.
    /// A missing parent or entry is tolerated and logged.
    fn unlink(&mut self, name: &str, inode_id: u32) -> Result<()> {
        let Some((parent, base)) = split(name) else {
            return Ok(());
        };
        let parent_id = match self.find_by_name(parent) {
            Ok(parent_id) => parent_id,
            Err(FsError::NotFound) => {
                warn!("parent {} of {} not found, no entry removed", parent, name);
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let parent_inode = self.get_inode(parent_id)?;
        if !parent_inode.is_dir() {
            warn!("parent {} of {} is not a directory", parent, name);
            return Ok(());
        }
        let block_id = parent_inode.direct_ptrs[0];
        match find_entry(&self.region, &self.layout, block_id, base) {
            Ok(slot) => {
                let entry = read_entry(&self.region, &self.layout, block_id, slot)?;
                if entry.inode_id != inode_id {
                    warn!(
                        "entry {} in {} refers to inode {}, not {}",
                        base, parent, entry.inode_id, inode_id
                    );
                    return Ok(());
                }
                clear_entry(&mut self.region, &self.layout, block_id, slot)
            }
            Err(FsError::NotFound) => {
                warn!("no entry {} in {}", base, parent);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// An entry is live when the inode it names is in use, has the same type,
    /// and carries the entry's full name.
    fn entry_is_live(&self, dir: &str, entry: &DirEntry) -> bool {
        match self.get_inode(entry.inode_id) {
            Ok(inode) => {
                inode.is_used()
                    && inode.ftype == entry.ftype
                    && inode.name_eq(&join(dir, &entry.name()))
            }
            Err(_) => false,
        }
    }

    fn rollback(&mut self, undo: Vec<Undo>) {
        for step in undo.into_iter().rev() {
            trace!("rollback {:?}", step);
            let result = match step {
                Undo::Block(block_id) => free_block(&mut self.region, &self.layout, block_id),
                Undo::Inode(inode_id) => release_inode(&mut self.region, &self.layout, inode_id),
                Undo::Entry { block_id, slot } => {
                    clear_entry(&mut self.region, &self.layout, block_id, slot)
                }
            };
            if let Err(e) = result {
                warn!("rollback step failed: {}", e);
            }
        }
    }
}

/// Lazy walk over the entries of all directories. Start over by calling `list` again.
pub struct Listing<'a, R: Region> {
    fs: &'a FileSystem<R>,
    inode_id: u32,
    slot: usize,
    current: Option<(String, u32)>,
}

impl<R: Region> Clone for Listing<'_, R> {
    fn clone(&self) -> Self {
        Self {
            fs: self.fs,
            inode_id: self.inode_id,
            slot: self.slot,
            current: self.current.clone(),
        }
    }
}

impl<R: Region> Listing<'_, R> {
    /// Moves to the next in-use directory at or after `inode_id`.
    fn next_dir(&mut self) -> Option<(String, u32)> {
        let fs = self.fs;
        while (self.inode_id as usize) < fs.layout.inode_count() {
            let inode_id = self.inode_id;
            self.inode_id += 1;
            let Ok(inode) = fs.get_inode(inode_id) else {
                continue;
            };
            if !inode.is_used() || !inode.is_dir() {
                continue;
            }
            let block_id = inode.direct_ptrs[0];
            if fs.layout.check_block(block_id).is_err() {
                warn!("directory {} has bad entry block {}", inode.name(), block_id);
                continue;
            }
            return Some((inode.name(), block_id));
        }
        None
    }
}

impl<R: Region> Iterator for Listing<'_, R> {
    type Item = ListEntry;

    fn next(&mut self) -> Option<ListEntry> {
        loop {
            if self.current.is_none() {
                self.current = Some(self.next_dir()?);
                self.slot = 0;
            }
            let (dir, block_id) = self.current.clone()?;
            while self.slot < NUM_ENTRY_PER_BLOCK {
                let slot = self.slot;
                self.slot += 1;
                let Ok(entry) = read_entry(&self.fs.region, &self.fs.layout, block_id, slot) else {
                    continue;
                };
                if !entry.is_used() {
                    continue;
                }
                if !self.fs.entry_is_live(&dir, &entry) {
                    warn!("skipping dangling entry {} in {}", entry.name(), dir);
                    continue;
                }
                let Some(ftype) = entry.file_type() else {
                    continue;
                };
                return Some(ListEntry {
                    dir,
                    name: entry.name(),
                    ftype,
                    inode_id: entry.inode_id,
                });
            }
            self.current = None;
        }
    }
}
