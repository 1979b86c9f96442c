// tests/config_loading.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use triggerd::config::{ConfigFile, load_and_validate};
use triggerd::engine::{DispatchOptions, TaskRegistry};
use triggerd::errors::TriggerdError;
use triggerd::task::Task;
use triggerd::types::DispatchMode;

fn demo(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

fn check_demo(cfg: &ConfigFile) {
    let options = DispatchOptions::from(&cfg.daemon);
    assert_eq!(options.mode, DispatchMode::Concurrent);
    assert_eq!(options.settle_delay, Duration::from_millis(500));

    let registry = TaskRegistry::from_config(cfg);
    assert_eq!(registry.len(), 2);
    let dirs: Vec<_> = registry.watch_set().iter().cloned().collect();
    assert_eq!(
        dirs,
        [PathBuf::from("/srv/drop/incoming"), PathBuf::from("/srv/site")]
    );

    let archive = registry.lookup(Path::new("/srv/drop/incoming/.ready")).unwrap();
    let Task::Move(mv) = archive.as_ref() else {
        panic!("expected a move task");
    };
    assert_eq!(mv.target, PathBuf::from("/srv/archive"));
    assert_eq!(mv.permissions.file_mode.as_deref(), Some("0644"));
    assert_eq!(mv.pre[0].argv, ["/usr/local/bin/check-space", "/srv/archive"]);
    assert_eq!(mv.pre[0].uid, None);
    assert_eq!(mv.post[0].argv, ["/usr/local/bin/reindex", "--root", "/srv/archive"]);
    assert_eq!(mv.post[0].uid, Some(33));
    assert_eq!(mv.post[0].timeout, Some(Duration::from_secs(300)));
    assert_eq!(mv.post[0].env.len(), 1);

    let rebuild = registry.lookup(Path::new("/srv/site/rebuild")).unwrap();
    let Task::Command(run) = rebuild.as_ref() else {
        panic!("expected a command task");
    };
    assert_eq!(run.commands.len(), 2);
    assert_eq!(run.commands[0].timeout, None);
    assert_eq!(run.commands[1].argv, ["/usr/bin/make", "-C", "/srv/site", "all"]);
}

#[test]
fn yaml_demo_loads() {
    check_demo(&load_and_validate(demo("config.yaml")).unwrap());
}

#[test]
fn toml_demo_loads() {
    check_demo(&load_and_validate(demo("config.toml")).unwrap());
}

#[test]
fn malformed_yaml_is_a_startup_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    std::fs::write(&path, "move_tasks: [ { trigger: /w/go").unwrap();
    assert!(matches!(load_and_validate(&path), Err(TriggerdError::YamlError(_))));
}

#[test]
fn malformed_toml_is_a_startup_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[[generic_tasks]\n").unwrap();
    assert!(matches!(load_and_validate(&path), Err(TriggerdError::TomlError(_))));
}

#[test]
fn unknown_dispatch_mode_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("c.yaml");
    std::fs::write(
        &path,
        "daemon: { dispatch: parallel }\ngeneric_tasks:\n  - { trigger: /w/go, run: [{ command: /bin/true }] }\n",
    )
    .unwrap();
    assert!(load_and_validate(&path).is_err());
}

#[test]
fn duplicate_triggers_keep_the_generic_task() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("c.yaml");
    std::fs::write(
        &path,
        "\
generic_tasks:
  - { trigger: /w/go, run: [{ command: /bin/true }] }
move_tasks:
  - { trigger: /w/go, source: /w/in, target: /w/out }
",
    )
    .unwrap();

    let cfg = load_and_validate(&path).unwrap();
    let registry = TaskRegistry::from_config(&cfg);
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.lookup(Path::new("/w/go")).unwrap().kind(), "command");
}
