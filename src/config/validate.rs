// src/config/validate.rs

use std::path::Path;

use crate::config::model::{
    CommandConfig, ConfigFile, MAX_SETTLE_DELAY_MS, RawConfigFile, normalize,
};
use crate::errors::{Result, TriggerdError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::TriggerdError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.daemon,
            raw.move_tasks,
            raw.generic_tasks,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_daemon_section(cfg)?;
    validate_move_tasks(cfg)?;
    validate_generic_tasks(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.move_tasks.is_empty() && cfg.generic_tasks.is_empty() {
        return Err(TriggerdError::ConfigError(
            "config must define at least one entry in `move_tasks` or `generic_tasks`"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_daemon_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.daemon.settle_delay_ms > MAX_SETTLE_DELAY_MS {
        return Err(TriggerdError::ConfigError(format!(
            "daemon.settle_delay_ms must be <= {MAX_SETTLE_DELAY_MS} (got {})",
            cfg.daemon.settle_delay_ms
        )));
    }
    Ok(())
}

fn validate_move_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (i, task) in cfg.move_tasks.iter().enumerate() {
        let at = format!("move_tasks[{i}]");
        validate_trigger(&at, &task.trigger)?;
        ensure_absolute(&format!("{at}.source"), &task.source)?;
        ensure_absolute(&format!("{at}.target"), &task.target)?;
        if normalize(&task.source) == normalize(&task.target) {
            return Err(TriggerdError::ConfigError(format!(
                "{at}.target {:?} must differ from {at}.source",
                task.target
            )));
        }
        validate_commands(&format!("{at}.pre"), &task.pre)?;
        validate_commands(&format!("{at}.post"), &task.post)?;
    }
    Ok(())
}

fn validate_generic_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (i, task) in cfg.generic_tasks.iter().enumerate() {
        let at = format!("generic_tasks[{i}]");
        validate_trigger(&at, &task.trigger)?;
        if task.run.is_empty() {
            return Err(TriggerdError::ConfigError(format!(
                "{at}.run must list at least one command"
            )));
        }
        validate_commands(&format!("{at}.run"), &task.run)?;
    }
    Ok(())
}

fn validate_trigger(at: &str, trigger: &Path) -> Result<()> {
    let field = format!("{at}.trigger");
    ensure_absolute(&field, trigger)?;
    if trigger.file_name().is_none() {
        return Err(TriggerdError::ConfigError(format!(
            "{field} {trigger:?} must name a file, not a directory"
        )));
    }
    match trigger.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(()),
        _ => Err(TriggerdError::ConfigError(format!(
            "{field} {trigger:?} has no parent directory to watch"
        ))),
    }
}

fn ensure_absolute(field: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(TriggerdError::ConfigError(format!("{field} must not be empty")));
    }
    if !path.is_absolute() {
        return Err(TriggerdError::ConfigError(format!(
            "{field} must be an absolute path (got {path:?})"
        )));
    }
    Ok(())
}

fn validate_commands(at: &str, commands: &[CommandConfig]) -> Result<()> {
    for (i, cmd) in commands.iter().enumerate() {
        if cmd.command.argv().is_empty() {
            return Err(TriggerdError::ConfigError(format!(
                "{at}[{i}].command must not be empty"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<ConfigFile> {
        let raw: RawConfigFile = serde_yaml::from_str(yaml)?;
        ConfigFile::try_from(raw)
    }

    fn config_error(yaml: &str) -> String {
        match parse(yaml) {
            Err(TriggerdError::ConfigError(msg)) => msg,
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn empty_config_is_rejected() {
        assert!(config_error("daemon: {}").contains("at least one"));
    }

    #[test]
    fn relative_paths_are_rejected() {
        let msg = config_error(
            "move_tasks:\n  - { trigger: /w/go, source: in, target: /w/out }",
        );
        assert!(msg.contains("move_tasks[0].source"), "{msg}");
    }

    #[test]
    fn trigger_must_have_a_parent_and_a_name() {
        let msg = config_error("generic_tasks:\n  - { trigger: /, run: [{ command: /bin/true }] }");
        assert!(msg.contains("generic_tasks[0].trigger"), "{msg}");
    }

    #[test]
    fn target_equal_to_source_is_rejected() {
        let msg = config_error(
            "move_tasks:\n  - { trigger: /w/go, source: /w/in, target: /w/./in/, overwrite: true }",
        );
        assert!(msg.contains("move_tasks[0].target"), "{msg}");
    }

    #[test]
    fn blank_command_is_rejected() {
        let msg = config_error(
            "generic_tasks:\n  - { trigger: /w/go, run: [{ command: '   ' }] }",
        );
        assert!(msg.contains("generic_tasks[0].run[0].command"), "{msg}");
    }

    #[test]
    fn generic_task_needs_commands() {
        let msg = config_error("generic_tasks:\n  - { trigger: /w/go }");
        assert!(msg.contains("at least one command"), "{msg}");
    }

    #[test]
    fn oversized_settle_delay_is_rejected() {
        let msg = config_error(
            "daemon: { settle_delay_ms: 600000 }\ngeneric_tasks:\n  - { trigger: /w/go, run: [{ command: /bin/true }] }",
        );
        assert!(msg.contains("settle_delay_ms"), "{msg}");
    }

    #[test]
    fn bad_mode_strings_are_not_a_load_error() {
        parse(
            "move_tasks:\n  - { trigger: /w/go, source: /w/in, target: /w/out, file_mode: 'rwx', user: nobody-here }",
        )
        .unwrap();
    }
}
