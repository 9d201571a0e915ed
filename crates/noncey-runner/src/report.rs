use std::collections::BTreeMap;
use std::fmt::Write as _;

use noncey_core::{Chain, SafeName, SkipReason, SweepMode, TaskName};
use serde::Serialize;

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    Assigned {
        task: TaskName,
        safe: SafeName,
        nonces: BTreeMap<SafeName, u64>,
    },
    Skipped {
        task: TaskName,
        reason: SkipReason,
    },
}

impl TaskOutcome {
    pub fn task(&self) -> &TaskName {
        match self {
            TaskOutcome::Assigned { task, .. } | TaskOutcome::Skipped { task, .. } => task,
        }
    }
}

/// What one sweep did, task by task, in sweep order.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct SweepReport {
    pub chain: Chain,
    pub dry_run: bool,
    pub tasks: Vec<TaskOutcome>,
    /// Counter values after the last task; the next free nonce per safe.
    pub next_nonces: BTreeMap<SafeName, u64>,
}

impl SweepReport {
    pub fn new(chain: Chain, mode: SweepMode) -> Self {
        Self { chain, dry_run: mode == SweepMode::DryRun, tasks: vec![], next_nonces: BTreeMap::new() }
    }

    pub fn assigned_count(&self) -> usize {
        self.tasks.iter().filter(|t| matches!(t, TaskOutcome::Assigned { .. })).count()
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{}: {} tasks, {} assigned{}",
            self.chain.dir_name(),
            self.tasks.len(),
            self.assigned_count(),
            if self.dry_run { " (dry run, nothing written)" } else { "" }
        );
        for t in &self.tasks {
            match t {
                TaskOutcome::Assigned { task, safe, nonces } => {
                    let list: Vec<String> = nonces.iter().map(|(s, n)| format!("{}={}", s, n)).collect();
                    let _ = writeln!(out, "- {} [{}] {}", task, safe, list.join(" "));
                }
                TaskOutcome::Skipped { task, reason } => {
                    let _ = writeln!(out, "- {} skipped ({})", task, skip_label(*reason));
                }
            }
        }
        out
    }
}

fn skip_label(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::NoConfig => "no config",
        SkipReason::NoSafe => "no safe",
        SkipReason::Executed => "executed",
    }
}
