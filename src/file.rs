//! Moving file bytes between data blocks and host streams.

use std::io::{Read, Write};

use crate::config::BLOCK_SIZE;
use crate::error::{FsError, Result};
use crate::layout::Layout;
use crate::region::Region;
use crate::structs::Inode;

/// Bytes of `size` that live in block `index` of `num_blocks`.
/// The last block holds the remainder, or a full block when the size is block aligned.
fn chunk_len(index: usize, num_blocks: usize, size: u64) -> usize {
    if index + 1 < num_blocks {
        BLOCK_SIZE
    } else {
        (size - (num_blocks as u64 - 1) * BLOCK_SIZE as u64) as usize
    }
}

/// Fills `blocks` in order with `size` bytes from `reader`.
/// The unused tail of the last block is zeroed.
pub fn copy_in(
    region: &mut impl Region,
    layout: &Layout,
    blocks: &[u32],
    size: u64,
    reader: &mut impl Read,
) -> Result<()> {
    for (i, &block_id) in blocks.iter().enumerate() {
        let len = chunk_len(i, blocks.len(), size);
        let block = region.slice_mut(layout.block_offset(block_id)?, BLOCK_SIZE)?;
        reader
            .read_exact(&mut block[..len])
            .map_err(FsError::SourceReadError)?;
        block[len..].fill(0);
    }
    Ok(())
}

/// Writes the bytes held by `inode` to `writer`. Returns the number of bytes written.
pub fn copy_out(
    region: &impl Region,
    layout: &Layout,
    inode: &Inode,
    writer: &mut impl Write,
) -> Result<u64> {
    let blocks = inode.blocks();
    let size = inode.size as u64;
    let mut written = 0;
    for (i, &block_id) in blocks.iter().enumerate() {
        let len = chunk_len(i, blocks.len(), size);
        let bytes = region.slice(layout.block_offset(block_id)?, len)?;
        writer.write_all(bytes).map_err(FsError::DestWriteError)?;
        written += len as u64;
    }
    writer.flush().map_err(FsError::DestWriteError)?;
    Ok(written)
}

/// Reads from `inode` starting at `offset` into `buffer`, stopping at end of file.
/// Returns the number of bytes read.
pub fn read_at(
    region: &impl Region,
    layout: &Layout,
    inode: &Inode,
    offset: u64,
    buffer: &mut [u8],
) -> Result<usize> {
    let size = inode.size as u64;
    if offset >= size {
        return Ok(0);
    }
    let to_read = buffer.len().min((size - offset) as usize);
    let blocks = inode.blocks();

    let mut bytes_read = 0;
    let mut current_offset = offset as usize;
    while bytes_read < to_read {
        let block_index = current_offset / BLOCK_SIZE;
        let start_offset = current_offset % BLOCK_SIZE;
        let len = (BLOCK_SIZE - start_offset).min(to_read - bytes_read);
        let block_id = *blocks.get(block_index).ok_or(FsError::OutOfBounds)?;
        let src = region.slice(layout.block_offset(block_id)? + start_offset, len)?;
        buffer[bytes_read..bytes_read + len].copy_from_slice(src);
        bytes_read += len;
        current_offset += len;
    }
    Ok(bytes_read)
}
