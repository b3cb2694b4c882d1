//! Common utilities for tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use segfs::{BLOCK_SIZE, FileSystem, Geometry, MemRegion};

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr) => {
        println!("{}[test] {}{}", crate::common::ORANGE, $msg, crate::common::RESET)
    };
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 64 data blocks, 32 inodes.
pub fn small_geometry() -> Geometry {
    Geometry::new(BLOCK_SIZE * 64, 32).unwrap()
}

pub fn mem_fs(geometry: Geometry) -> FileSystem<MemRegion> {
    init_logger();
    let region = MemRegion::new(segfs::Layout::new(geometry).total_len);
    FileSystem::format(region, geometry).unwrap()
}

/// Deterministic, non-repeating-per-block test content.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

pub fn host_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}
