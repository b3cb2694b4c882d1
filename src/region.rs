//! The byte region a segment lives in.
//! All record access goes through the provided methods of `Region`, so bounds are checked in one place.

use bytemuck::Pod;

use crate::error::{FsError, Result};

pub trait Region {
    /// Returns the whole region.
    fn as_bytes(&self) -> &[u8];

    /// Returns the whole region for writing.
    fn as_bytes_mut(&mut self) -> &mut [u8];

    /// Persists outstanding writes to the backing store.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn len(&self) -> usize {
        self.as_bytes().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let end = offset.checked_add(len).ok_or(FsError::OutOfBounds)?;
        self.as_bytes().get(offset..end).ok_or(FsError::OutOfBounds)
    }

    fn slice_mut(&mut self, offset: usize, len: usize) -> Result<&mut [u8]> {
        let end = offset.checked_add(len).ok_or(FsError::OutOfBounds)?;
        self.as_bytes_mut().get_mut(offset..end).ok_or(FsError::OutOfBounds)
    }

    /// Reads a record of type `T` at byte `offset`. No alignment is required.
    fn read_at<T: Pod>(&self, offset: usize) -> Result<T> {
        let bytes = self.slice(offset, size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    /// Writes a record of type `T` at byte `offset`.
    fn write_at<T: Pod>(&mut self, offset: usize, record: &T) -> Result<()> {
        let bytes = self.slice_mut(offset, size_of::<T>())?;
        bytes.copy_from_slice(bytemuck::bytes_of(record));
        Ok(())
    }

    fn fill(&mut self, offset: usize, len: usize, value: u8) -> Result<()> {
        self.slice_mut(offset, len)?.fill(value);
        Ok(())
    }
}

/// Heap-backed region. Contents vanish with it.
#[derive(Debug, Clone)]
pub struct MemRegion {
    inner: Vec<u8>,
}

impl MemRegion {
    pub fn new(len: usize) -> Self {
        Self {
            inner: vec![0u8; len],
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.inner
    }
}

impl From<Vec<u8>> for MemRegion {
    fn from(inner: Vec<u8>) -> Self {
        Self { inner }
    }
}

impl Region for MemRegion {
    fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.inner
    }
}
