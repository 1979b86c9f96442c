// src/watch/mod.rs

//! File watching.
//!
//! This module is responsible for:
//! - Registering a non-recursive `notify` watch on every directory of the
//!   watch set.
//! - Reducing raw events to "this path now exists" and forwarding them to
//!   the dispatch loop.
//!
//! It does **not** know which paths are triggers; the dispatch loop does
//! that lookup.

pub mod filter;
pub mod watcher;

pub use filter::created_paths;
pub use watcher::{WatcherHandle, spawn_watcher};
