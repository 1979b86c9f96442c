// src/perms.rs

//! Ownership and mode remediation for transferred entries.
//!
//! A [`Remediator`] is built once per move task from the task's
//! [`PermissionSpec`]. Mode strings and user/group names are resolved up
//! front; anything that fails to resolve becomes a [`RemediationWarning`]
//! and that part of the remediation is skipped. Nothing in here can fail a
//! transfer: every problem is reported back as a warning.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use nix::fcntl::AtFlags;
use nix::unistd::{Gid, Group, Uid, User, chown, fchownat};
use thiserror::Error;
use walkdir::WalkDir;

/// Ownership and mode strings as they appear in a move task definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSpec {
    pub file_mode: Option<String>,
    pub dir_mode: Option<String>,
    pub user: Option<String>,
    pub group: Option<String>,
}

impl PermissionSpec {
    pub fn is_empty(&self) -> bool {
        self.file_mode.is_none()
            && self.dir_mode.is_none()
            && self.user.is_none()
            && self.group.is_none()
    }
}

#[derive(Error, Debug)]
pub enum RemediationWarning {
    #[error("invalid {kind} mode {spec:?}: {reason}")]
    InvalidMode {
        kind: &'static str,
        spec: String,
        reason: String,
    },

    #[error("user {0:?} not found")]
    UnknownUser(String),

    #[error("group {0:?} not found")]
    UnknownGroup(String),

    #[error("looking up {what} {name:?}: {source}")]
    Lookup {
        what: &'static str,
        name: String,
        #[source]
        source: nix::Error,
    },

    #[error("chmod {path:?}: {source}")]
    Chmod {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("chown {path:?}: {source}")]
    Chown {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },

    #[error("walking {path:?}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Parse an octal permission string such as `"0640"`, `"750"` or `"0o2775"`.
pub fn parse_mode(spec: &str) -> Result<u32, String> {
    let trimmed = spec.trim();
    let digits = trimmed
        .strip_prefix("0o")
        .or_else(|| trimmed.strip_prefix("0O"))
        .unwrap_or(trimmed);
    if digits.is_empty() {
        return Err("empty mode".to_string());
    }
    let value = u32::from_str_radix(digits, 8).map_err(|e| e.to_string())?;
    if value > 0o7777 {
        return Err(format!("{value:#o} exceeds 0o7777"));
    }
    Ok(value)
}

/// Resolved remediation settings, ready to apply to any number of paths.
#[derive(Debug, Clone, Default)]
pub struct Remediator {
    file_mode: Option<u32>,
    dir_mode: Option<u32>,
    uid: Option<Uid>,
    gid: Option<Gid>,
}

impl Remediator {
    /// Resolve a spec. Warnings describe the parts that will be skipped.
    pub fn resolve(spec: &PermissionSpec) -> (Self, Vec<RemediationWarning>) {
        let mut warnings = Vec::new();

        let mut mode = |kind: &'static str, raw: &Option<String>| match raw.as_deref() {
            None => None,
            Some(s) if s.trim().is_empty() => None,
            Some(s) => match parse_mode(s) {
                Ok(m) => Some(m),
                Err(reason) => {
                    warnings.push(RemediationWarning::InvalidMode {
                        kind,
                        spec: s.to_string(),
                        reason,
                    });
                    None
                }
            },
        };
        let file_mode = mode("file", &spec.file_mode);
        let dir_mode = mode("directory", &spec.dir_mode);

        let uid = spec
            .user
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|name| match resolve_user(name) {
                Ok(uid) => Some(uid),
                Err(w) => {
                    warnings.push(w);
                    None
                }
            });
        let gid = spec
            .group
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|name| match resolve_group(name) {
                Ok(gid) => Some(gid),
                Err(w) => {
                    warnings.push(w);
                    None
                }
            });

        (
            Self {
                file_mode,
                dir_mode,
                uid,
                gid,
            },
            warnings,
        )
    }

    /// True when applying would not touch anything.
    pub fn is_noop(&self) -> bool {
        self.file_mode.is_none() && self.dir_mode.is_none() && self.uid.is_none() && self.gid.is_none()
    }

    /// Apply mode and ownership to a single path of the given kind.
    pub fn apply(&self, path: &Path, is_dir: bool) -> Vec<RemediationWarning> {
        let mut warnings = Vec::new();

        let mode = if is_dir { self.dir_mode } else { self.file_mode };
        if let Some(mode) = mode {
            if let Err(source) = fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
                warnings.push(RemediationWarning::Chmod {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }

        // `None` maps to -1 ("unchanged") for whichever id was not configured.
        if self.uid.is_some() || self.gid.is_some() {
            if let Err(source) = chown(path, self.uid, self.gid) {
                warnings.push(RemediationWarning::Chown {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }

        warnings
    }

    /// Ownership only, on the link itself. Link modes are never changed.
    pub fn apply_link(&self, path: &Path) -> Vec<RemediationWarning> {
        if self.uid.is_none() && self.gid.is_none() {
            return Vec::new();
        }
        match fchownat(None, path, self.uid, self.gid, AtFlags::AT_SYMLINK_NOFOLLOW) {
            Ok(()) => Vec::new(),
            Err(source) => vec![RemediationWarning::Chown {
                path: path.to_path_buf(),
                source,
            }],
        }
    }

    /// Apply to `root` and every node below it, each with its own kind.
    ///
    /// Symlinks are never followed; they get [`Remediator::apply_link`].
    pub fn apply_tree(&self, root: &Path) -> Vec<RemediationWarning> {
        let mut warnings = Vec::new();
        if self.is_noop() {
            return warnings;
        }

        for entry in WalkDir::new(root).follow_links(false) {
            match entry {
                Ok(entry) => {
                    if entry.path_is_symlink() {
                        warnings.extend(self.apply_link(entry.path()));
                    } else {
                        warnings.extend(self.apply(entry.path(), entry.file_type().is_dir()));
                    }
                }
                Err(source) => warnings.push(RemediationWarning::Walk {
                    path: root.to_path_buf(),
                    source,
                }),
            }
        }

        warnings
    }
}

fn resolve_user(name: &str) -> Result<Uid, RemediationWarning> {
    if let Ok(id) = name.parse::<u32>() {
        return Ok(Uid::from_raw(id));
    }
    match User::from_name(name) {
        Ok(Some(user)) => Ok(user.uid),
        Ok(None) => Err(RemediationWarning::UnknownUser(name.to_string())),
        Err(source) => Err(RemediationWarning::Lookup {
            what: "user",
            name: name.to_string(),
            source,
        }),
    }
}

fn resolve_group(name: &str) -> Result<Gid, RemediationWarning> {
    if let Ok(id) = name.parse::<u32>() {
        return Ok(Gid::from_raw(id));
    }
    match Group::from_name(name) {
        Ok(Some(group)) => Ok(group.gid),
        Ok(None) => Err(RemediationWarning::UnknownGroup(name.to_string())),
        Err(source) => Err(RemediationWarning::Lookup {
            what: "group",
            name: name.to_string(),
            source,
        }),
    }
}
