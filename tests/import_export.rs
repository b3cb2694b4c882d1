mod common;

use std::io::{self, Read, Write};
use std::path::Path;

use common::{host_file, mem_fs, pattern, small_geometry};
use segfs::{BLOCK_SIZE, Error, FileType, Geometry, HostIo, Region};
use tempfile::tempdir;

#[test]
fn test_import_export_scenario() {
    let dir = tempdir().unwrap();
    let data = pattern(10000);
    let src = host_file(dir.path(), "a.txt", &data);

    let mut fs = mem_fs(Geometry::new(BLOCK_SIZE * 64, 1024).unwrap());
    let inode_id = fs.import(&src, "/a.txt").unwrap();
    let inode = fs.get_inode(inode_id).unwrap();
    assert_eq!(inode.size, 10000);
    assert_eq!(inode.num_blocks(), 3);
    assert_eq!(inode.file_type(), Some(FileType::Regular));
    assert!(inode.name_eq("/a.txt"));

    // The last block holds the remainder followed by zeroes.
    let last = inode.blocks()[2];
    let block = fs
        .region()
        .slice(fs.layout().block_offset(last).unwrap(), BLOCK_SIZE)
        .unwrap();
    assert_eq!(&block[..1808], &data[8192..]);
    assert!(block[1808..].iter().all(|&b| b == 0));

    let dest = dir.path().join("out.txt");
    assert_eq!(fs.export("/a.txt", &dest).unwrap(), 10000);
    assert_eq!(std::fs::read(&dest).unwrap(), data);
    log!("{}", fs.dump());
}

#[test]
fn test_round_trip_sizes() {
    let dir = tempdir().unwrap();
    let mut fs = mem_fs(small_geometry());
    for (size, blocks) in [(0, 0), (1, 1), (BLOCK_SIZE, 1), (BLOCK_SIZE + 1, 2)] {
        let data = pattern(size);
        let src = host_file(dir.path(), &format!("in{}", size), &data);
        let name = format!("/f{}", size);
        let inode_id = fs.import(&src, &name).unwrap();
        assert_eq!(fs.get_inode(inode_id).unwrap().num_blocks(), blocks);

        let dest = dir.path().join(format!("out{}", size));
        assert_eq!(fs.export(&name, &dest).unwrap(), size as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), data, "size {}", size);
    }
}

#[test]
fn test_export_truncates_existing_destination() {
    let dir = tempdir().unwrap();
    let mut fs = mem_fs(small_geometry());
    fs.write_file("/short", b"abc").unwrap();
    let dest = host_file(dir.path(), "existing", &pattern(9000));
    fs.export("/short", &dest).unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), b"abc");
}

#[test]
fn test_missing_source() {
    let dir = tempdir().unwrap();
    let mut fs = mem_fs(small_geometry());
    let usage = fs.usage().unwrap();
    let result = fs.import(dir.path().join("missing"), "/missing");
    assert!(matches!(result, Err(Error::SourceReadError(_))));
    assert_eq!(fs.usage().unwrap(), usage);
}

/// Host whose files are in memory; reads fail after `fail_after` bytes and
/// writes fail after `fail_after` bytes.
struct FlakyHost {
    data: Vec<u8>,
    fail_after: usize,
}

struct FlakyReader {
    data: Vec<u8>,
    pos: usize,
    fail_after: usize,
}

impl Read for FlakyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.fail_after {
            return Err(io::Error::other("device went away"));
        }
        let end = self.data.len().min(self.fail_after).min(self.pos + buf.len());
        let len = end - self.pos;
        buf[..len].copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        Ok(len)
    }
}

struct FlakyWriter {
    written: usize,
    fail_after: usize,
}

impl Write for FlakyWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written + buf.len() > self.fail_after {
            return Err(io::Error::other("disk full"));
        }
        self.written += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl HostIo for FlakyHost {
    type Reader = FlakyReader;
    type Writer = FlakyWriter;

    fn exists(&self, _path: &Path) -> bool {
        true
    }

    fn file_size(&self, _path: &Path) -> io::Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn open_read(&self, _path: &Path) -> io::Result<FlakyReader> {
        Ok(FlakyReader {
            data: self.data.clone(),
            pos: 0,
            fail_after: self.fail_after,
        })
    }

    fn open_write(&self, _path: &Path) -> io::Result<FlakyWriter> {
        Ok(FlakyWriter {
            written: 0,
            fail_after: self.fail_after,
        })
    }
}

#[test]
fn test_source_read_error_rolls_back() {
    let mut fs = mem_fs(small_geometry());
    fs.write_file("/existing", b"keep").unwrap();
    let usage = fs.usage().unwrap();

    let host = FlakyHost {
        data: pattern(BLOCK_SIZE * 3),
        fail_after: BLOCK_SIZE + 100,
    };
    let result = fs.import_with(&host, Path::new("flaky"), "/new/file");
    assert!(matches!(result, Err(Error::SourceReadError(_))));
    assert_eq!(fs.usage().unwrap(), usage);
    assert!(matches!(fs.find_by_name("/new/file"), Err(Error::NotFound)));
    assert!(matches!(fs.find_by_name("/new"), Err(Error::NotFound)));
    assert_eq!(fs.read_dir("/").unwrap().len(), 1);
}

#[test]
fn test_dest_write_error_keeps_store() {
    let mut fs = mem_fs(small_geometry());
    let data = pattern(BLOCK_SIZE * 2);
    fs.write_file("/f", &data).unwrap();
    let before = fs.region().clone().into_inner();

    let host = FlakyHost {
        data: Vec::new(),
        fail_after: BLOCK_SIZE,
    };
    let result = fs.export_with(&host, "/f", Path::new("sink"));
    assert!(matches!(result, Err(Error::DestWriteError(_))));
    assert_eq!(fs.region().clone().into_inner(), before);
    assert_eq!(fs.read_file("/f").unwrap(), data);
}

#[test]
fn test_export_errors() {
    let dir = tempdir().unwrap();
    let mut fs = mem_fs(small_geometry());
    fs.write_file("/docs/a", b"a").unwrap();

    let dest = dir.path().join("out");
    assert!(matches!(fs.export("/nope", &dest), Err(Error::NotFound)));
    assert!(matches!(fs.export("/docs", &dest), Err(Error::IsDirectory)));
    assert!(!dest.exists());

    let bad_dest = dir.path().join("no_such_dir").join("out");
    assert!(matches!(fs.export("/docs/a", &bad_dest), Err(Error::DestWriteError(_))));
}

#[test]
fn test_import_insufficient_space() {
    let dir = tempdir().unwrap();
    let mut fs = mem_fs(Geometry::new(BLOCK_SIZE * 8, 8).unwrap());
    let src = host_file(dir.path(), "big", &pattern(BLOCK_SIZE * 8));
    let result = fs.import(&src, "/big");
    assert!(matches!(result, Err(Error::InsufficientSpace)));
    let usage = fs.usage().unwrap();
    assert_eq!(usage.used_blocks, 0);
    assert_eq!(usage.used_inodes, 0);
}
