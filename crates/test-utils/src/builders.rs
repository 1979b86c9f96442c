#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use triggerd::config::{
    CommandConfig, CommandLine, ConfigFile, DaemonSection, GenericTaskConfig, MoveTaskConfig,
};
use triggerd::exec::{CommandSpec, ProcessBackend};
use triggerd::fs::{FileSystem, RealFileSystem};
use triggerd::perms::PermissionSpec;
use triggerd::task::{MoveTask, TaskContext, Trigger};
use triggerd::types::DispatchMode;

/// `CommandSpec` from a whitespace-separated command line.
pub fn cmd(line: &str) -> CommandSpec {
    CommandSpec::new(line.split_whitespace())
}

/// `/bin/sh -c <script>`.
pub fn sh(script: impl Into<String>) -> CommandSpec {
    CommandSpec::new(["/bin/sh".to_string(), "-c".to_string(), script.into()])
}

pub fn context(fs: impl FileSystem + 'static, processes: impl ProcessBackend + 'static) -> TaskContext {
    TaskContext::new(Arc::new(fs), Arc::new(processes), CancellationToken::new())
}

pub fn real_context_with(processes: impl ProcessBackend + 'static) -> TaskContext {
    context(RealFileSystem, processes)
}

/// Scratch tree laid out like a typical drop directory:
/// `<root>/w` (watched, holds the trigger), `<root>/w/in`, `<root>/w/out`.
pub struct Workspace {
    _dir: TempDir,
    root: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        fs::create_dir_all(root.join("w/in")).unwrap();
        fs::create_dir_all(root.join("w/out")).unwrap();
        Self { _dir: dir, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).symlink_metadata().is_ok()
    }
}

/// Builder for `MoveTask` to simplify test setup.
pub struct MoveTaskBuilder {
    task: MoveTask,
}

impl MoveTaskBuilder {
    pub fn new(trigger: impl Into<PathBuf>, source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            task: MoveTask {
                trigger: Trigger::new(trigger),
                source: source.into(),
                target: target.into(),
                permissions: PermissionSpec::default(),
                overwrite: false,
                pre: Vec::new(),
                post: Vec::new(),
            },
        }
    }

    /// Trigger `w/go`, source `w/in`, target `w/out` inside `ws`.
    pub fn in_workspace(ws: &Workspace) -> Self {
        Self::new(ws.path("w/go"), ws.path("w/in"), ws.path("w/out"))
    }

    pub fn trigger(mut self, trigger: impl Into<PathBuf>) -> Self {
        self.task.trigger = Trigger::new(trigger);
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.task.overwrite = overwrite;
        self
    }

    pub fn file_mode(mut self, mode: &str) -> Self {
        self.task.permissions.file_mode = Some(mode.to_string());
        self
    }

    pub fn dir_mode(mut self, mode: &str) -> Self {
        self.task.permissions.dir_mode = Some(mode.to_string());
        self
    }

    pub fn pre(mut self, command: CommandSpec) -> Self {
        self.task.pre.push(command);
        self
    }

    pub fn post(mut self, command: CommandSpec) -> Self {
        self.task.post.push(command);
        self
    }

    pub fn build(self) -> MoveTask {
        self.task
    }
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    daemon: DaemonSection,
    move_tasks: Vec<MoveTaskConfig>,
    generic_tasks: Vec<GenericTaskConfig>,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            daemon: DaemonSection::default(),
            move_tasks: Vec::new(),
            generic_tasks: Vec::new(),
        }
    }

    pub fn with_dispatch(mut self, mode: DispatchMode) -> Self {
        self.daemon.dispatch = mode;
        self
    }

    pub fn with_settle_delay_ms(mut self, ms: u64) -> Self {
        self.daemon.settle_delay_ms = ms;
        self
    }

    pub fn with_move_task(mut self, trigger: &Path, source: &Path, target: &Path) -> Self {
        self.move_tasks.push(MoveTaskConfig {
            trigger: trigger.to_path_buf(),
            source: source.to_path_buf(),
            target: target.to_path_buf(),
            user: None,
            group: None,
            file_mode: None,
            dir_mode: None,
            overwrite: false,
            pre: Vec::new(),
            post: Vec::new(),
        });
        self
    }

    /// Generic task running each `/bin/sh -c` script in order.
    pub fn with_generic_task(mut self, trigger: &Path, scripts: &[&str]) -> Self {
        self.generic_tasks.push(GenericTaskConfig {
            trigger: trigger.to_path_buf(),
            run: scripts
                .iter()
                .map(|s| CommandConfig {
                    command: CommandLine::Argv(vec![
                        "/bin/sh".to_string(),
                        "-c".to_string(),
                        s.to_string(),
                    ]),
                    uid: None,
                    gid: None,
                    timeout: 0,
                    env: Default::default(),
                })
                .collect(),
        });
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::new_unchecked(self.daemon, self.move_tasks, self.generic_tasks)
    }
}
