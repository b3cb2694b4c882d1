use crate::error::{FsError, Result};

pub const BLOCK_SIZE: usize = 4096;
pub const DEFAULT_REGION_SIZE: usize = 1024 * 1024 * 100; // 100 MiB of data blocks
pub const DEFAULT_INODES: usize = 1024;

pub const NAME_LEN: usize = 1000; // Inode name field, NUL padded
pub const DIRENT_NAME_LEN: usize = 256; // Directory entry name field, NUL padded
pub const NUM_DIRECT_PTRS: usize = BLOCK_SIZE / 4 - 4;

pub const DIRECTORY: u32 = 1;
pub const REGULAR_FILE: u32 = 2;

pub const ROOT_NAME: &str = "/";

/// Runtime dimensions of a segment.
/// `region_size` counts data bytes only; control structures sit in front of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub region_size: usize,
    pub inode_count: usize,
}

impl Geometry {
    pub fn new(region_size: usize, inode_count: usize) -> Result<Self> {
        if region_size == 0 || region_size % BLOCK_SIZE != 0 || region_size > u32::MAX as usize {
            return Err(FsError::InvalidGeometry);
        }
        let block_count = region_size / BLOCK_SIZE;
        if block_count % 8 != 0 {
            return Err(FsError::InvalidGeometry);
        }
        if inode_count == 0 || inode_count > u32::MAX as usize {
            return Err(FsError::InvalidGeometry);
        }
        Ok(Self {
            region_size,
            inode_count,
        })
    }

    pub fn block_count(&self) -> usize {
        self.region_size / BLOCK_SIZE
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            region_size: DEFAULT_REGION_SIZE,
            inode_count: DEFAULT_INODES,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_reference_geometry() {
        let geometry = Geometry::default();
        assert_eq!(geometry.block_count(), 25600);
        assert_eq!(Geometry::new(DEFAULT_REGION_SIZE, DEFAULT_INODES).unwrap(), geometry);
    }

    #[test]
    fn test_invalid_geometry() {
        assert!(matches!(Geometry::new(0, 16), Err(FsError::InvalidGeometry)));
        assert!(matches!(Geometry::new(BLOCK_SIZE * 8 + 1, 16), Err(FsError::InvalidGeometry)));
        assert!(matches!(Geometry::new(BLOCK_SIZE * 7, 16), Err(FsError::InvalidGeometry)));
        assert!(matches!(Geometry::new(BLOCK_SIZE * 8, 0), Err(FsError::InvalidGeometry)));
    }
}
