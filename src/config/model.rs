// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::exec::CommandSpec;
use crate::perms::PermissionSpec;
use crate::task::{CommandTask, MoveTask, Task, Trigger};
use crate::types::DispatchMode;

/// Top-level configuration as read from disk, before validation.
///
/// ```yaml
/// daemon:
///   dispatch: concurrent
///   settle_delay_ms: 500
///
/// move_tasks:
///   - trigger: /srv/drop/go
///     source: /srv/drop
///     target: /srv/archive
///     user: www-data
///     file_mode: "0644"
///     dir_mode: "0755"
///     overwrite: false
///     post:
///       - command: /usr/local/bin/reindex /srv/archive
///         timeout: 60
///
/// generic_tasks:
///   - trigger: /srv/jobs/rebuild
///     run:
///       - command: ["/usr/bin/make", "-C", "/srv/site"]
///         uid: 1000
///         gid: 1000
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub daemon: DaemonSection,

    #[serde(default)]
    pub move_tasks: Vec<MoveTaskConfig>,

    #[serde(default)]
    pub generic_tasks: Vec<GenericTaskConfig>,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`
/// (or [`ConfigFile::new_unchecked`] in tests).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub daemon: DaemonSection,
    pub move_tasks: Vec<MoveTaskConfig>,
    pub generic_tasks: Vec<GenericTaskConfig>,
}

impl ConfigFile {
    pub fn new_unchecked(
        daemon: DaemonSection,
        move_tasks: Vec<MoveTaskConfig>,
        generic_tasks: Vec<GenericTaskConfig>,
    ) -> Self {
        Self {
            daemon,
            move_tasks,
            generic_tasks,
        }
    }

    /// Build runtime tasks in registration order: move tasks first, then
    /// generic tasks.
    pub fn tasks(&self) -> Vec<Task> {
        let moves = self.move_tasks.iter().map(|t| Task::Move(t.to_task()));
        let generics = self.generic_tasks.iter().map(|t| Task::Command(t.to_task()));
        moves.chain(generics).collect()
    }
}

/// `daemon:` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonSection {
    #[serde(default)]
    pub dispatch: DispatchMode,

    /// Pause between seeing a trigger and running its task.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

pub const MAX_SETTLE_DELAY_MS: u64 = 60_000;

fn default_settle_delay_ms() -> u64 {
    500
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            dispatch: DispatchMode::default(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl DaemonSection {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// A command line: either one whitespace-separated string or an argv list.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CommandLine {
    Line(String),
    Argv(Vec<String>),
}

impl CommandLine {
    pub fn argv(&self) -> Vec<String> {
        match self {
            CommandLine::Line(line) => line.split_whitespace().map(str::to_string).collect(),
            CommandLine::Argv(argv) => argv.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandConfig {
    pub command: CommandLine,

    /// Absent means the daemon's own uid.
    #[serde(default)]
    pub uid: Option<u32>,

    #[serde(default)]
    pub gid: Option<u32>,

    /// Seconds; 0 disables the timeout.
    #[serde(default)]
    pub timeout: u64,

    /// The complete child environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl CommandConfig {
    pub fn to_spec(&self) -> CommandSpec {
        let mut spec = CommandSpec::new(self.command.argv()).with_credentials(self.uid, self.gid);
        if self.timeout > 0 {
            spec = spec.with_timeout(Duration::from_secs(self.timeout));
        }
        spec.env = self.env.clone();
        spec
    }
}

/// One entry of `move_tasks:`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoveTaskConfig {
    pub trigger: PathBuf,
    pub source: PathBuf,
    pub target: PathBuf,

    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    /// Octal string such as `"0644"`; checked when applied, not at load time.
    #[serde(default)]
    pub file_mode: Option<String>,
    #[serde(default)]
    pub dir_mode: Option<String>,

    #[serde(default)]
    pub overwrite: bool,

    #[serde(default)]
    pub pre: Vec<CommandConfig>,
    #[serde(default)]
    pub post: Vec<CommandConfig>,
}

impl MoveTaskConfig {
    pub fn to_task(&self) -> MoveTask {
        MoveTask {
            trigger: Trigger::new(normalize(&self.trigger)),
            source: normalize(&self.source),
            target: normalize(&self.target),
            permissions: PermissionSpec {
                file_mode: self.file_mode.clone(),
                dir_mode: self.dir_mode.clone(),
                user: self.user.clone(),
                group: self.group.clone(),
            },
            overwrite: self.overwrite,
            pre: self.pre.iter().map(CommandConfig::to_spec).collect(),
            post: self.post.iter().map(CommandConfig::to_spec).collect(),
        }
    }
}

/// One entry of `generic_tasks:`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenericTaskConfig {
    pub trigger: PathBuf,
    #[serde(default)]
    pub run: Vec<CommandConfig>,
}

impl GenericTaskConfig {
    pub fn to_task(&self) -> CommandTask {
        CommandTask::new(
            normalize(&self.trigger),
            self.run.iter().map(CommandConfig::to_spec).collect(),
        )
    }
}

/// Lexical cleanup so `/w//go` and `/w/./go` key the same trigger as `/w/go`.
/// `..` is kept as written; symlinks are not resolved.
pub fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
