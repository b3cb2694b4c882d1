//! Name validation and splitting.
//!
//! Names are absolute paths used verbatim as inode keys. Splitting only derives the parent
//! directory's key and the entry name; nothing walks directories.

use crate::config::{DIRENT_NAME_LEN, NAME_LEN, ROOT_NAME};
use crate::error::{FsError, Result};

/// Checks that `name` can be stored: absolute, no empty or dot components, fits the name fields.
pub fn validate(name: &str) -> Result<()> {
    if !name.starts_with('/') || name.len() >= NAME_LEN || name.contains('\0') {
        return Err(FsError::InvalidName);
    }
    if name == ROOT_NAME {
        return Ok(());
    }
    for component in name[1..].split('/') {
        if component.is_empty() || component == "." || component == ".." {
            return Err(FsError::InvalidName);
        }
        if component.len() >= DIRENT_NAME_LEN {
            return Err(FsError::InvalidName);
        }
    }
    Ok(())
}

/// Splits a name into (parent name, final component).
/// The root has no parent and yields `None`.
pub fn split(name: &str) -> Option<(&str, &str)> {
    if name == ROOT_NAME {
        return None;
    }
    let idx = name.rfind('/')?;
    let parent = if idx == 0 { ROOT_NAME } else { &name[..idx] };
    Some((parent, &name[idx + 1..]))
}

/// Inverse of `split`: the full name of entry `base` inside directory `dir`.
pub fn join(dir: &str, base: &str) -> String {
    if dir == ROOT_NAME {
        format!("/{}", base)
    } else {
        format!("{}/{}", dir, base)
    }
}
