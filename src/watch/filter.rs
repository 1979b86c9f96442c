// src/watch/filter.rs

use std::path::PathBuf;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};

/// Paths that came into existence with this event.
///
/// Creation, and the destination side of a rename, both count. The combined
/// `RenameMode::Both` event is ignored because the backend also reports its
/// `To` half separately.
pub fn created_paths(event: &Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(_) => event.paths.clone(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.clone(),
        _ => Vec::new(),
    }
}
