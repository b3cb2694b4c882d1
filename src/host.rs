//! The host side of import and export.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

pub trait HostIo {
    type Reader: Read;
    type Writer: Write;

    fn exists(&self, path: &Path) -> bool;

    fn file_size(&self, path: &Path) -> io::Result<u64>;

    fn open_read(&self, path: &Path) -> io::Result<Self::Reader>;

    /// Opens `path` for writing, creating it or truncating existing contents.
    fn open_write(&self, path: &Path) -> io::Result<Self::Writer>;
}

/// Host I/O through `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdHost;

impl HostIo for StdHost {
    type Reader = File;
    type Writer = File;

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn file_size(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }

    fn open_read(&self, path: &Path) -> io::Result<File> {
        File::open(path)
    }

    fn open_write(&self, path: &Path) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        options.open(path)
    }
}
