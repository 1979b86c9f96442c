// src/task/trigger.rs

//! Trigger paths and their on-disk state machine.
//!
//! A trigger's state lives entirely in the filesystem:
//!
//! - absent: nothing at `<trigger>` or `<trigger>.processing`
//! - present: `<trigger>` exists and nobody has claimed it yet
//! - processing: `<trigger>` was renamed to `<trigger>.processing`
//!
//! The claim is a single `rename(2)`, which is what makes dispatch safe when
//! two events for the same path race: exactly one rename succeeds.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};

use crate::fs::{FileSystem, remove_if_present};

/// Suffix appended to a claimed trigger.
pub const PROCESSING_SUFFIX: &str = ".processing";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Absent,
    Present,
    Processing,
    /// Both the trigger and a stale marker exist.
    PresentWithStaleMarker,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Trigger {
    path: PathBuf,
    marker: PathBuf,
}

impl Trigger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut marker: OsString = path.clone().into_os_string();
        marker.push(PROCESSING_SUFFIX);
        Self {
            path,
            marker: PathBuf::from(marker),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<trigger>.processing`
    pub fn marker(&self) -> &Path {
        &self.marker
    }

    /// Directory that must be watched to see this trigger appear.
    pub fn watch_dir(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }

    /// True if a directory entry called `name` is this trigger or its
    /// marker. Move tasks never transfer such entries.
    pub fn is_self_reference(&self, name: &OsStr) -> bool {
        Some(name) == self.path.file_name() || Some(name) == self.marker.file_name()
    }

    /// Rename `<trigger>` to `<trigger>.processing`.
    pub fn claim(&self, fs: &dyn FileSystem) -> io::Result<()> {
        fs.rename(&self.path, &self.marker)
    }

    /// Delete both the trigger and its marker. Missing files are fine.
    ///
    /// On failure the offending path is returned with the error.
    pub fn release(&self, fs: &dyn FileSystem) -> Result<(), (PathBuf, io::Error)> {
        remove_if_present(fs, &self.path).map_err(|e| (self.path.clone(), e))?;
        remove_if_present(fs, &self.marker).map_err(|e| (self.marker.clone(), e))?;
        Ok(())
    }

    pub fn state(&self, fs: &dyn FileSystem) -> TriggerState {
        match (fs.entry_exists(&self.path), fs.entry_exists(&self.marker)) {
            (false, false) => TriggerState::Absent,
            (true, false) => TriggerState::Present,
            (false, true) => TriggerState::Processing,
            (true, true) => TriggerState::PresentWithStaleMarker,
        }
    }
}

impl From<PathBuf> for Trigger {
    fn from(path: PathBuf) -> Self {
        Trigger::new(path)
    }
}

impl From<&Path> for Trigger {
    fn from(path: &Path) -> Self {
        Trigger::new(path)
    }
}

impl From<&str> for Trigger {
    fn from(path: &str) -> Self {
        Trigger::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::RealFileSystem;
    use std::fs;
    use std::sync::{Arc, Barrier};

    #[test]
    fn marker_is_trigger_plus_suffix() {
        let t = Trigger::new("/w/go");
        assert_eq!(t.marker(), Path::new("/w/go.processing"));
        assert_eq!(t.watch_dir(), Some(Path::new("/w")));
        assert!(t.is_self_reference(OsStr::new("go")));
        assert!(t.is_self_reference(OsStr::new("go.processing")));
        assert!(!t.is_self_reference(OsStr::new("go.txt")));
    }

    #[test]
    fn claim_then_release_walks_the_states() {
        let dir = tempfile::tempdir().unwrap();
        let t = Trigger::new(dir.path().join("go"));
        let fs_ = RealFileSystem;

        assert_eq!(t.state(&fs_), TriggerState::Absent);
        fs::write(t.path(), b"").unwrap();
        assert_eq!(t.state(&fs_), TriggerState::Present);

        t.claim(&fs_).unwrap();
        assert_eq!(t.state(&fs_), TriggerState::Processing);

        t.release(&fs_).unwrap();
        assert_eq!(t.state(&fs_), TriggerState::Absent);
    }

    #[test]
    fn release_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let t = Trigger::new(dir.path().join("go"));
        t.release(&RealFileSystem).unwrap();
        t.release(&RealFileSystem).unwrap();
    }

    #[test]
    fn claiming_a_missing_trigger_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let t = Trigger::new(dir.path().join("go"));
        let err = t.claim(&RealFileSystem).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!t.marker().exists());
    }

    #[test]
    fn racing_claims_have_exactly_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let t = Arc::new(Trigger::new(dir.path().join("go")));
        fs::write(t.path(), b"").unwrap();

        let racers = 8;
        let barrier = Arc::new(Barrier::new(racers));
        let handles: Vec<_> = (0..racers)
            .map(|_| {
                let t = Arc::clone(&t);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    t.claim(&RealFileSystem).is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(t.state(&RealFileSystem), TriggerState::Processing);
    }
}
