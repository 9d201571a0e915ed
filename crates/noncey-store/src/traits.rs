use std::collections::BTreeMap;
use std::sync::Arc;

use noncey_core::{Chain, Registry, SafeName, TaskName, TaskRecord};

/// Persistence seen by the sweep: one registry and a directory of task records per chain.
pub trait TaskStore: Send + Sync {
    /// Where the registry of `chain` is expected, for error messages.
    fn registry_location(&self, chain: Chain) -> String;

    fn load_registry(&self, chain: Chain) -> anyhow::Result<Option<Registry>>;

    /// Raw names of the entries under the chain's task root, unfiltered and unsorted.
    fn list_task_dirs(&self, chain: Chain) -> anyhow::Result<Vec<String>>;

    /// `Ok(None)` when the task directory has no config resource.
    fn load_task(&self, chain: Chain, task: &TaskName) -> anyhow::Result<Option<TaskRecord>>;

    /// Set `nonces.<safe>` for every entry, leaving the rest of the record as it was.
    fn write_nonces(&self, chain: Chain, task: &TaskName, nonces: &BTreeMap<SafeName, u64>) -> anyhow::Result<()>;
}

impl<T: TaskStore + ?Sized> TaskStore for Arc<T> {
    fn registry_location(&self, chain: Chain) -> String {
        (**self).registry_location(chain)
    }

    fn load_registry(&self, chain: Chain) -> anyhow::Result<Option<Registry>> {
        (**self).load_registry(chain)
    }

    fn list_task_dirs(&self, chain: Chain) -> anyhow::Result<Vec<String>> {
        (**self).list_task_dirs(chain)
    }

    fn load_task(&self, chain: Chain, task: &TaskName) -> anyhow::Result<Option<TaskRecord>> {
        (**self).load_task(chain, task)
    }

    fn write_nonces(&self, chain: Chain, task: &TaskName, nonces: &BTreeMap<SafeName, u64>) -> anyhow::Result<()> {
        (**self).write_nonces(chain, task, nonces)
    }
}
