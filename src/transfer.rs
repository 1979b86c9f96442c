// src/transfer.rs

//! Single-entry move with atomic-rename-with-fallback semantics.
//!
//! [`move_entry`] first tries `rename(2)`. Only a cross-device failure
//! (`EXDEV`) falls back to a recursive copy followed by recursive removal of
//! the source; every other rename error is returned as-is. Callers decide
//! what to do about an existing destination before calling in here.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::fs::FileSystem;

/// How an entry reached its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMethod {
    /// Same filesystem; a single atomic rename.
    Rename,
    /// Different filesystems; copied then deleted. `source_removed` is false
    /// when the copy succeeded but deleting the source did not.
    Copy { source_removed: bool },
}

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("renaming {from:?} to {to:?}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("copying {from:?} to {to:?} across filesystems: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// True if `err` is the "source and destination are on different
/// filesystems" rename failure.
pub fn is_cross_device(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::CrossesDevices || err.raw_os_error() == Some(nix::libc::EXDEV)
}

/// Move `src` to `dest`, falling back to copy + delete across filesystems.
///
/// `dest` must not exist.
pub fn move_entry(
    fs: &dyn FileSystem,
    src: &Path,
    dest: &Path,
) -> Result<TransferMethod, TransferError> {
    let rename_err = match fs.rename(src, dest) {
        Ok(()) => return Ok(TransferMethod::Rename),
        Err(e) => e,
    };

    if !is_cross_device(&rename_err) {
        return Err(TransferError::Rename {
            from: src.to_path_buf(),
            to: dest.to_path_buf(),
            source: rename_err,
        });
    }

    debug!(from = ?src, to = ?dest, "cross-device rename; falling back to copy");

    if let Err(source) = copy_tree(fs, src, dest) {
        // Anything at `dest` now is our own partial copy.
        if fs.entry_exists(dest) {
            if let Err(e) = fs.remove_entry(dest) {
                warn!(path = ?dest, error = %e, "failed to remove partial copy");
            }
        }
        return Err(TransferError::Copy {
            from: src.to_path_buf(),
            to: dest.to_path_buf(),
            source,
        });
    }

    let source_removed = match fs.remove_entry(src) {
        Ok(()) => true,
        Err(e) => {
            warn!(path = ?src, error = %e, "copied across filesystems but could not remove source");
            false
        }
    };

    Ok(TransferMethod::Copy { source_removed })
}

/// Recursively copy `src` to `dest`.
///
/// Regular files keep their permission bits, directories get theirs applied
/// after their children are copied, and symlinks are recreated rather than
/// followed. Other file types (fifos, sockets, devices) are refused.
pub fn copy_tree(fs: &dyn FileSystem, src: &Path, dest: &Path) -> io::Result<()> {
    let meta = fs.symlink_metadata(src)?;
    let file_type = meta.file_type();

    if file_type.is_symlink() {
        let target = fs.read_link(src)?;
        return fs.symlink(&target, dest);
    }

    if file_type.is_dir() {
        fs.create_dir(dest)?;
        for child in fs.read_dir(src)? {
            let Some(name) = child.file_name() else {
                continue;
            };
            copy_tree(fs, &child, &dest.join(name))?;
        }
        return fs.set_permissions(dest, meta.permissions());
    }

    if file_type.is_file() {
        fs.copy_file(src, dest)?;
        return Ok(());
    }

    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot copy special file {src:?}"),
    ))
}
