// src/fs/mock.rs

//! Fault-injecting filesystem for tests.
//!
//! [`FaultyFileSystem`] behaves like [`RealFileSystem`] on a real (temporary)
//! tree, except for operations that have been told to fail. This is how the
//! cross-device fallback gets exercised on a single mount.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{FileSystem, RealFileSystem};

/// A failure to inject, keyed on the path an operation touches.
#[derive(Debug, Clone)]
enum Fault {
    /// `rename` whose source is under this prefix fails with `EXDEV`.
    CrossDeviceRename(PathBuf),
    /// `rename` whose source is under this prefix fails with this raw errno.
    RenameErrno(PathBuf, i32),
    /// `copy_file` whose source is under this prefix fails with this errno.
    CopyErrno(PathBuf, i32),
    /// `remove_file`/`remove_dir_all` on this exact path fails with this errno.
    RemoveErrno(PathBuf, i32),
}

#[derive(Debug, Clone, Default)]
pub struct FaultyFileSystem {
    inner: RealFileSystem,
    faults: Arc<Mutex<Vec<Fault>>>,
    renames: Arc<Mutex<Vec<(PathBuf, PathBuf)>>>,
}

impl FaultyFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every rename of an entry below `prefix` reports a cross-device error.
    pub fn cross_device_below(&self, prefix: impl AsRef<Path>) -> &Self {
        self.push(Fault::CrossDeviceRename(prefix.as_ref().to_path_buf()))
    }

    pub fn fail_rename_below(&self, prefix: impl AsRef<Path>, errno: i32) -> &Self {
        self.push(Fault::RenameErrno(prefix.as_ref().to_path_buf(), errno))
    }

    pub fn fail_copy_below(&self, prefix: impl AsRef<Path>, errno: i32) -> &Self {
        self.push(Fault::CopyErrno(prefix.as_ref().to_path_buf(), errno))
    }

    pub fn fail_remove_of(&self, path: impl AsRef<Path>, errno: i32) -> &Self {
        self.push(Fault::RemoveErrno(path.as_ref().to_path_buf(), errno))
    }

    /// Renames that actually reached the real filesystem, in order.
    pub fn successful_renames(&self) -> Vec<(PathBuf, PathBuf)> {
        self.renames.lock().unwrap().clone()
    }

    fn push(&self, fault: Fault) -> &Self {
        self.faults.lock().unwrap().push(fault);
        self
    }

    fn rename_fault(&self, from: &Path) -> Option<io::Error> {
        let faults = self.faults.lock().unwrap();
        faults.iter().find_map(|f| match f {
            Fault::CrossDeviceRename(prefix) if from.starts_with(prefix) => {
                Some(io::Error::from_raw_os_error(nix::libc::EXDEV))
            }
            Fault::RenameErrno(prefix, errno) if from.starts_with(prefix) => {
                Some(io::Error::from_raw_os_error(*errno))
            }
            _ => None,
        })
    }

    fn copy_fault(&self, from: &Path) -> Option<io::Error> {
        let faults = self.faults.lock().unwrap();
        faults.iter().find_map(|f| match f {
            Fault::CopyErrno(prefix, errno) if from.starts_with(prefix) => {
                Some(io::Error::from_raw_os_error(*errno))
            }
            _ => None,
        })
    }

    fn remove_fault(&self, path: &Path) -> Option<io::Error> {
        let faults = self.faults.lock().unwrap();
        faults.iter().find_map(|f| match f {
            Fault::RemoveErrno(target, errno) if target == path => {
                Some(io::Error::from_raw_os_error(*errno))
            }
            _ => None,
        })
    }
}

impl FileSystem for FaultyFileSystem {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if let Some(err) = self.rename_fault(from) {
            return Err(err);
        }
        self.inner.rename(from, to)?;
        self.renames
            .lock()
            .unwrap()
            .push((from.to_path_buf(), to.to_path_buf()));
        Ok(())
    }

    fn symlink_metadata(&self, path: &Path) -> io::Result<fs::Metadata> {
        self.inner.symlink_metadata(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        match self.remove_fault(path) {
            Some(err) => Err(err),
            None => self.inner.remove_file(path),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        match self.remove_fault(path) {
            Some(err) => Err(err),
            None => self.inner.remove_dir_all(path),
        }
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        self.inner.create_dir(path)
    }

    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<u64> {
        match self.copy_fault(from) {
            Some(err) => Err(err),
            None => self.inner.copy_file(from, to),
        }
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        self.inner.read_link(path)
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        self.inner.symlink(target, link)
    }

    fn set_permissions(&self, path: &Path, perms: fs::Permissions) -> io::Result<()> {
        self.inner.set_permissions(path, perms)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.inner.read_dir(path)
    }
}
