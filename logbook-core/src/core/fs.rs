//! Filesystem primitives used by the export engine.
//!
//! These helpers report what they find and never try to recover: a non-empty
//! directory is an error unless the caller cleared it first with
//! [`remove_tree`].

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};

use log::{debug, info};

use crate::{LogbookError, Result};

/// Owner-execute bit added to directory modes so exported trees stay traversable.
const OWNER_EXEC: u32 = 0o100;

/// Makes sure `path` is an empty directory, creating it when absent.
///
/// New directories get `permissions | 0o100` on Unix.
///
/// # Errors
///
/// Returns [`LogbookError::NotADirectory`] if `path` is a file,
/// [`LogbookError::DirectoryNotEmpty`] if it is a directory with content,
/// [`LogbookError::MissingParent`] if it is absent and so is its parent, or
/// [`LogbookError::Io`] if it cannot be inspected or created.
pub fn ensure_empty_dir(path: &Path, permissions: u32) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) => {
            if !meta.is_dir() {
                return Err(LogbookError::NotADirectory(path.to_path_buf()));
            }
            if fs::read_dir(path)?.next().is_some() {
                return Err(LogbookError::DirectoryNotEmpty(path.to_path_buf()));
            }
            debug!("reusing empty directory {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                if !parent.is_dir() {
                    return Err(LogbookError::MissingParent(parent.to_path_buf()));
                }
            }
            create_dir(path, permissions | OWNER_EXEC)?;
            info!("created directory {}", path.display());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(unix)]
fn create_dir(path: &Path, mode: u32) -> std::io::Result<()> {
    fs::DirBuilder::new().mode(mode).create(path)
}

#[cfg(not(unix))]
fn create_dir(path: &Path, _mode: u32) -> std::io::Result<()> {
    fs::create_dir(path)
}

/// Deletes `path` depth-first. With `children_only` the directory itself is kept.
///
/// Symlinks found below `path` are removed, never followed. With
/// `children_only`, a `path` that is a symlink to a directory has the target's
/// children cleared. A missing `path` is not an error.
pub fn remove_tree(path: &Path, children_only: bool) -> Result<()> {
    let lookup = if children_only {
        fs::metadata(path)
    } else {
        fs::symlink_metadata(path)
    };
    let meta = match lookup {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    if meta.is_dir() {
        for child in fs::read_dir(path)? {
            remove_tree(&child?.path(), false)?;
        }
    }

    if children_only {
        return Ok(());
    }

    if meta.is_dir() {
        info!("deleting directory {}", path.display());
        fs::remove_dir(path)?;
    } else {
        info!("deleting file {}", path.display());
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Writes `bytes` to `path`, creating or truncating it. New files get
/// `permissions` on Unix (subject to the process umask).
pub fn write_file(path: &Path, bytes: &[u8], permissions: u32) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(permissions);
    #[cfg(not(unix))]
    let _ = permissions;

    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    debug!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
