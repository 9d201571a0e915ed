use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Context, Result};
use noncey_core::{Chain, Registry, Safe, SafeName, TaskName, TaskRecord};
use noncey_store::TaskStore;
use serde::Deserialize;
use toml_edit::{DocumentMut, Item};
use tracing::debug;

pub const DEFAULT_REGISTRY_FILE: &str = "safes.toml";
pub const DEFAULT_TASK_FILE: &str = "config.toml";

#[derive(Deserialize)]
struct RegistryFile {
    safes: Vec<Safe>,
}

/// Task tree on disk: `<root>/<chain>/<registry_file>` and `<root>/<chain>/<task>/<task_file>`.
///
/// Task files are edited in place; only keys under `nonces` change. A write edits the
/// document parsed by the preceding `load_task`, so each task file is read once per sweep.
#[derive(Debug)]
pub struct FsTaskStore {
    pub root: PathBuf,
    pub registry_file: String,
    pub task_file: String,
    docs: Mutex<HashMap<PathBuf, DocumentMut>>,
}

impl FsTaskStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            registry_file: DEFAULT_REGISTRY_FILE.to_string(),
            task_file: DEFAULT_TASK_FILE.to_string(),
            docs: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_files(mut self, registry_file: impl Into<String>, task_file: impl Into<String>) -> Self {
        self.registry_file = registry_file.into();
        self.task_file = task_file.into();
        self
    }

    pub fn chain_dir(&self, chain: Chain) -> PathBuf {
        self.root.join(chain.dir_name())
    }

    pub fn registry_path(&self, chain: Chain) -> PathBuf {
        self.chain_dir(chain).join(&self.registry_file)
    }

    pub fn task_path(&self, chain: Chain, task: &TaskName) -> PathBuf {
        self.chain_dir(chain).join(task.as_str()).join(&self.task_file)
    }

    fn lock_docs(&self) -> Result<MutexGuard<'_, HashMap<PathBuf, DocumentMut>>> {
        self.docs.lock().map_err(|_| anyhow!("task document cache lock poisoned"))
    }

    fn read_doc(path: &Path) -> Result<DocumentMut> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        s.parse::<DocumentMut>().with_context(|| format!("parse {}", path.display()))
    }
}

impl TaskStore for FsTaskStore {
    fn registry_location(&self, chain: Chain) -> String {
        self.registry_path(chain).display().to_string()
    }

    fn load_registry(&self, chain: Chain) -> Result<Option<Registry>> {
        let path = self.registry_path(chain);
        if !path.is_file() {
            return Ok(None);
        }
        let s = std::fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        let file: RegistryFile = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
        let registry = Registry::new(file.safes).with_context(|| format!("load {}", path.display()))?;
        Ok(Some(registry))
    }

    fn list_task_dirs(&self, chain: Chain) -> Result<Vec<String>> {
        let dir = self.chain_dir(chain);
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir).with_context(|| format!("read dir {}", dir.display()))? {
            let entry = entry?;
            // Follows symlinks: a linked task directory still takes part in the sweep.
            if !entry.path().is_dir() {
                continue;
            }
            // Non UTF-8 names can never carry a task prefix we sort on.
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn load_task(&self, chain: Chain, task: &TaskName) -> Result<Option<TaskRecord>> {
        let path = self.task_path(chain, task);
        if !path.is_file() {
            return Ok(None);
        }
        let doc = Self::read_doc(&path)?;
        let record = task_record(&doc).with_context(|| format!("task config {}", path.display()))?;
        self.lock_docs()?.insert(path, doc);
        Ok(Some(record))
    }

    fn write_nonces(&self, chain: Chain, task: &TaskName, nonces: &BTreeMap<SafeName, u64>) -> Result<()> {
        let path = self.task_path(chain, task);
        let cached = self.lock_docs()?.remove(&path);
        let mut doc = match cached {
            Some(doc) => doc,
            None => Self::read_doc(&path)?,
        };
        set_nonces(&mut doc, nonces).with_context(|| format!("update nonces in {}", path.display()))?;
        std::fs::write(&path, doc.to_string()).with_context(|| format!("write {}", path.display()))?;
        debug!(path = %path.display(), count = nonces.len(), "wrote nonces");
        Ok(())
    }
}

fn task_record(doc: &DocumentMut) -> Result<TaskRecord> {
    let safe = match doc.get("safe") {
        None => None,
        Some(item) => match item.as_str() {
            Some(s) => Some(SafeName::from(s)),
            None => bail!("`safe` must be a string"),
        },
    };
    let mut nonces = BTreeMap::new();
    if let Some(table) = doc.get("nonces").and_then(Item::as_table_like) {
        for (name, item) in table.iter() {
            if let Some(n) = item.as_integer().and_then(|n| u64::try_from(n).ok()) {
                nonces.insert(SafeName::from(name), n);
            }
        }
    }
    Ok(TaskRecord { safe, executed: doc.contains_key("executed"), nonces })
}

fn set_nonces(doc: &mut DocumentMut, nonces: &BTreeMap<SafeName, u64>) -> Result<()> {
    let table = doc
        .entry("nonces")
        .or_insert(toml_edit::table())
        .as_table_like_mut()
        .ok_or_else(|| anyhow!("`nonces` must be a table"))?;
    for (safe, &n) in nonces {
        let n = i64::try_from(n).with_context(|| format!("nonce {} for {} does not fit in a TOML integer", n, safe))?;
        match table.get_mut(safe.as_str()) {
            // Keep the spacing and trailing comment of an existing entry.
            Some(Item::Value(existing)) => {
                let decor = existing.decor().clone();
                *existing = toml_edit::Value::from(n);
                *existing.decor_mut() = decor;
            }
            _ => {
                table.insert(safe.as_str(), toml_edit::value(n));
            }
        }
    }
    Ok(())
}
