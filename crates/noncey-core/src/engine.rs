use std::collections::BTreeMap;

use crate::counter::NonceCounter;
use crate::errors::SweepError;
use crate::ids::{SafeName, TaskName};
use crate::model::{Registry, SkipReason, TaskRecord};
use crate::resolve::resolve;

/// Task directories are the entries whose name starts with three decimal digits.
pub fn is_task_dir_name(name: &str) -> bool {
    let b = name.as_bytes();
    b.len() >= 3 && b[..3].iter().all(u8::is_ascii_digit)
}

/// Filter directory names down to tasks, in sweep order (plain byte order).
pub fn order_tasks<I, S>(names: I) -> Vec<TaskName>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut tasks: Vec<TaskName> = names
        .into_iter()
        .map(Into::into)
        .filter(|n: &String| is_task_dir_name(n))
        .map(TaskName)
        .collect();
    tasks.sort();
    tasks
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Disposition<'a> {
    Skip(SkipReason),
    Eligible(&'a SafeName),
}

/// Decide whether a task takes part in the sweep. `None` means the task has no config.
pub fn disposition(record: Option<&TaskRecord>) -> Disposition<'_> {
    let Some(record) = record else {
        return Disposition::Skip(SkipReason::NoConfig);
    };
    if record.executed {
        return Disposition::Skip(SkipReason::Executed);
    }
    match &record.safe {
        Some(safe) => Disposition::Eligible(safe),
        None => Disposition::Skip(SkipReason::NoSafe),
    }
}

/// Compute the nonces for one eligible task and advance the counter.
///
/// On error the counter is left as it was.
pub fn assign(
    registry: &Registry,
    counter: &mut NonceCounter,
    task: &TaskName,
    safe: &SafeName,
) -> Result<BTreeMap<SafeName, u64>, SweepError> {
    if !registry.contains(safe) {
        return Err(SweepError::UnknownSafe { task: task.clone(), safe: safe.clone() });
    }
    let involved = resolve(registry, safe).map_err(|source| SweepError::Resolve { task: task.clone(), source })?;
    counter
        .take(&involved)
        .map_err(|missing| SweepError::UnknownSafe { task: task.clone(), safe: missing })
}
