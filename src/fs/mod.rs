// src/fs/mod.rs

//! Filesystem seam used by trigger claims and the transfer engine.
//!
//! Everything that moves or deletes entries goes through [`FileSystem`] so
//! tests can inject failures (most importantly cross-device renames) without
//! needing two real mounts. Errors stay as `std::io::Error` because callers
//! branch on the error kind.

use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn symlink_metadata(&self, path: &Path) -> io::Result<fs::Metadata>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
    fn create_dir(&self, path: &Path) -> io::Result<()>;
    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<u64>;
    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()>;
    fn set_permissions(&self, path: &Path, perms: fs::Permissions) -> io::Result<()>;

    /// Return the entries of a directory as full paths, sorted by name.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// True if something (file, directory, or symlink, even dangling) exists.
    fn entry_exists(&self, path: &Path) -> bool {
        self.symlink_metadata(path).is_ok()
    }

    /// Remove whatever lives at `path`, recursing into real directories.
    fn remove_entry(&self, path: &Path) -> io::Result<()> {
        let meta = self.symlink_metadata(path)?;
        if meta.is_dir() {
            self.remove_dir_all(path)
        } else {
            self.remove_file(path)
        }
    }
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn symlink_metadata(&self, path: &Path) -> io::Result<fs::Metadata> {
        fs::symlink_metadata(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path)
    }

    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<u64> {
        fs::copy(from, to)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        fs::read_link(path)
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        std::os::unix::fs::symlink(target, link)
    }

    fn set_permissions(&self, path: &Path, perms: fs::Permissions) -> io::Result<()> {
        fs::set_permissions(path, perms)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            entries.push(entry?.path());
        }
        entries.sort();
        Ok(entries)
    }
}

/// Remove `path`, treating "not found" as success.
///
/// Used for trigger and processing-marker cleanup, which must be idempotent.
pub fn remove_if_present(fs: &dyn FileSystem, path: &Path) -> io::Result<()> {
    match fs.remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
