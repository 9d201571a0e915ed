use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context};
use noncey_core::{Chain, Registry, Safe, SafeName, TaskName, TaskRecord};

use crate::traits::TaskStore;

/// In-memory store for tests. Not durable, but good for engine and scenario tests.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    registries: HashMap<Chain, Vec<Safe>>,
    // Directory name -> config, `None` for a directory without one.
    tasks: HashMap<Chain, BTreeMap<String, Option<TaskRecord>>>,
    writes: Vec<TaskName>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    pub fn set_registry(&self, chain: Chain, safes: Vec<Safe>) -> anyhow::Result<()> {
        self.lock()?.registries.insert(chain, safes);
        Ok(())
    }

    /// Add a directory under the chain's task root. `record` is its config, if any.
    pub fn add_dir(&self, chain: Chain, name: &str, record: Option<TaskRecord>) -> anyhow::Result<()> {
        self.lock()?.tasks.entry(chain).or_default().insert(name.to_string(), record);
        Ok(())
    }

    pub fn task(&self, chain: Chain, name: &str) -> anyhow::Result<Option<TaskRecord>> {
        let inner = self.lock()?;
        Ok(inner.tasks.get(&chain).and_then(|t| t.get(name)).cloned().flatten())
    }

    /// Tasks written so far, in write order.
    pub fn writes(&self) -> anyhow::Result<Vec<TaskName>> {
        Ok(self.lock()?.writes.clone())
    }
}

impl TaskStore for InMemoryStore {
    fn registry_location(&self, chain: Chain) -> String {
        format!("memory:{}", chain.dir_name())
    }

    fn load_registry(&self, chain: Chain) -> anyhow::Result<Option<Registry>> {
        let inner = self.lock()?;
        match inner.registries.get(&chain) {
            Some(safes) => Ok(Some(Registry::new(safes.clone())?)),
            None => Ok(None),
        }
    }

    fn list_task_dirs(&self, chain: Chain) -> anyhow::Result<Vec<String>> {
        let inner = self.lock()?;
        Ok(inner.tasks.get(&chain).map(|t| t.keys().cloned().collect()).unwrap_or_default())
    }

    fn load_task(&self, chain: Chain, task: &TaskName) -> anyhow::Result<Option<TaskRecord>> {
        self.task(chain, task.as_str())
    }

    fn write_nonces(&self, chain: Chain, task: &TaskName, nonces: &BTreeMap<SafeName, u64>) -> anyhow::Result<()> {
        let mut inner = self.lock()?;
        let record = inner
            .tasks
            .get_mut(&chain)
            .and_then(|t| t.get_mut(task.as_str()))
            .and_then(Option::as_mut)
            .with_context(|| format!("no config for task {}", task))?;
        record.nonces.extend(nonces.iter().map(|(k, v)| (k.clone(), *v)));
        inner.writes.push(task.clone());
        Ok(())
    }
}
