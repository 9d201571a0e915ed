use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use noncey_store_fs::{DEFAULT_REGISTRY_FILE, DEFAULT_TASK_FILE};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub tasks: TasksConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TasksConfig {
    /// Directory holding one subdirectory per chain, relative to the repo root.
    #[serde(default = "default_tasks_root")]
    pub root: String,
    #[serde(default = "default_registry_file")]
    pub registry_file: String,
    #[serde(default = "default_task_file")]
    pub task_file: String,
}

fn default_tasks_root() -> String {
    "src/improvements/tasks".to_string()
}

fn default_registry_file() -> String {
    DEFAULT_REGISTRY_FILE.to_string()
}

fn default_task_file() -> String {
    DEFAULT_TASK_FILE.to_string()
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            root: default_tasks_root(),
            registry_file: default_registry_file(),
            task_file: default_task_file(),
        }
    }
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
        Ok(cfg)
    }

    /// An explicit path must exist; the default `noncey.toml` is optional.
    pub fn load(repo_root: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        let path = Self::config_path(repo_root);
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn config_path(repo_root: &Path) -> PathBuf {
        repo_root.join("noncey.toml")
    }

    pub fn tasks_root(&self, repo_root: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(&self.tasks.root).to_string();
        repo_root.join(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_default_config_falls_back() {
        let dir = tempdir().unwrap();
        let cfg = Config::load(dir.path(), None).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.tasks_root(dir.path()), dir.path().join("src/improvements/tasks"));
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(Config::config_path(dir.path()), "[tasks]\nroot = \"tasks\"\n").unwrap();
        let cfg = Config::load(dir.path(), None).unwrap();
        assert_eq!(cfg.tasks.root, "tasks");
        assert_eq!(cfg.tasks.registry_file, "safes.toml");
        assert_eq!(cfg.tasks.task_file, "config.toml");
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = tempdir().unwrap();
        assert!(Config::load(dir.path(), Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn absolute_root_ignores_repo_root() {
        let cfg = Config { tasks: TasksConfig { root: "/srv/tasks".into(), ..Default::default() } };
        assert_eq!(cfg.tasks_root(Path::new("/repo")), PathBuf::from("/srv/tasks"));
    }
}
