//! Region backed by a shared mapping of a file.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;
use std::ptr::NonNull;

use log::debug;

use crate::error::{FsError, Result};
use crate::region::Region;

pub struct MappedRegion {
    ptr: Option<NonNull<u8>>,
    len: usize,
    // Keeps the descriptor open for as long as the mapping lives.
    _file: File,
}

impl MappedRegion {
    /// Maps the first `len` bytes of `file` read/write and shared.
    /// The file must already be at least `len` bytes long.
    pub fn acquire(file: File, len: usize) -> Result<Self> {
        let file_len = file.metadata().map_err(FsError::MapFailed)?.len();
        if file_len < len as u64 {
            return Err(FsError::RegionTooSmall);
        }
        // SAFETY: a fresh mapping is requested at a kernel chosen address; the result is checked.
        let addr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(FsError::MapFailed(io::Error::last_os_error()));
        }
        let ptr = NonNull::new(addr as *mut u8)
            .ok_or_else(|| FsError::MapFailed(io::Error::other("null mapping")))?;
        debug!("mapped {} bytes at {:p}", len, ptr);
        Ok(Self {
            ptr: Some(ptr),
            len,
            _file: file,
        })
    }

    /// Opens or creates the image at `path`, grows it to `len` bytes if shorter, and maps it.
    pub fn open(path: impl AsRef<Path>, len: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())
            .map_err(FsError::MapFailed)?;
        if file.metadata().map_err(FsError::MapFailed)?.len() < len as u64 {
            file.set_len(len as u64).map_err(FsError::MapFailed)?;
        }
        Self::acquire(file, len)
    }

    /// Maps an image that must already exist and hold at least `len` bytes.
    /// Nothing is created or resized.
    pub fn open_existing(path: impl AsRef<Path>, len: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path.as_ref())
            .map_err(FsError::MapFailed)?;
        Self::acquire(file, len)
    }

    /// Unmaps the region. Calling it again is a no-op.
    pub fn release(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            // SAFETY: ptr/len describe the mapping created in `acquire`, and it is unmapped only once.
            unsafe {
                libc::munmap(ptr.as_ptr() as *mut libc::c_void, self.len);
            }
            debug!("unmapped {} bytes", self.len);
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.ptr.is_some()
    }
}

impl Region for MappedRegion {
    fn as_bytes(&self) -> &[u8] {
        match self.ptr {
            // SAFETY: the mapping is valid for len bytes until released, and release needs &mut self.
            Some(ptr) => unsafe { std::slice::from_raw_parts(ptr.as_ptr(), self.len) },
            None => &[],
        }
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        match self.ptr {
            // SAFETY: as above; &mut self guarantees exclusive access.
            Some(ptr) => unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), self.len) },
            None => &mut [],
        }
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ptr) = self.ptr {
            // SAFETY: ptr/len describe a live mapping.
            let ret = unsafe { libc::msync(ptr.as_ptr() as *mut libc::c_void, self.len, libc::MS_SYNC) };
            if ret != 0 {
                return Err(FsError::Io(io::Error::last_os_error()));
            }
        }
        Ok(())
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        self.release();
    }
}
