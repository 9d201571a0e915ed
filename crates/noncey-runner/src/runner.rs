use std::path::Path;

use anyhow::Result;
use noncey_core::{assign, disposition, order_tasks, Chain, Disposition, NonceCounter, Registry, SweepError, SweepMode};
use noncey_store::TaskStore;
use noncey_store_fs::FsTaskStore;
use tracing::{debug, info, info_span};

use crate::{doctor::check_registry, report::TaskOutcome, Config, RegistryCheck, SweepReport};

pub struct Sweeper {
    pub store: Box<dyn TaskStore>,
}

impl Sweeper {
    pub fn new(store: Box<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Sweeper over the task tree configured for `repo_root`.
    pub fn open(repo_root: &Path, cfg: &Config) -> Self {
        let store = FsTaskStore::new(cfg.tasks_root(repo_root))
            .with_files(cfg.tasks.registry_file.clone(), cfg.tasks.task_file.clone());
        Self::new(Box::new(store))
    }

    fn registry(&self, chain: Chain) -> Result<Registry> {
        match self.store.load_registry(chain)? {
            Some(r) => Ok(r),
            None => Err(SweepError::MissingRegistry { chain, location: self.store.registry_location(chain) }.into()),
        }
    }

    /// One ordered pass over every task of `chain`.
    ///
    /// Stops at the first fatal error. Tasks written before it keep their new nonces.
    pub fn run(&self, chain: Chain, mode: SweepMode) -> Result<SweepReport> {
        let dry_run = mode == SweepMode::DryRun;
        let span = info_span!("sweep", chain = chain.dir_name(), dry_run);
        let _enter = span.enter();

        let registry = self.registry(chain)?;
        let mut counter = NonceCounter::from_registry(&registry);
        let tasks = order_tasks(self.store.list_task_dirs(chain)?);
        info!(safes = registry.len(), tasks = tasks.len(), "starting sweep");

        let mut report = SweepReport::new(chain, mode);
        for task in tasks {
            let record = self.store.load_task(chain, &task)?;
            let safe = match disposition(record.as_ref()) {
                Disposition::Skip(reason) => {
                    debug!(task = %task, ?reason, "skipping task");
                    report.tasks.push(TaskOutcome::Skipped { task, reason });
                    continue;
                }
                Disposition::Eligible(safe) => safe.clone(),
            };

            let nonces = assign(&registry, &mut counter, &task, &safe)?;
            if mode == SweepMode::Write {
                self.store.write_nonces(chain, &task, &nonces)?;
            }
            info!(task = %task, safe = %safe, ?nonces, "assigned nonces");
            report.tasks.push(TaskOutcome::Assigned { task, safe, nonces });
        }

        report.next_nonces = counter.into_values();
        info!(assigned = report.assigned_count(), "sweep complete");
        Ok(report)
    }

    /// Validate the registry of `chain` without touching any task.
    pub fn check(&self, chain: Chain) -> Result<RegistryCheck> {
        let registry = self.registry(chain)?;
        check_registry(&registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use noncey_core::{Safe, SafeName, SkipReason, TaskName, TaskRecord};
    use noncey_store::InMemoryStore;

    fn rec(safe: Option<&str>, executed: bool) -> Option<TaskRecord> {
        Some(TaskRecord { safe: safe.map(SafeName::from), executed, nonces: BTreeMap::new() })
    }

    fn setup() -> (Arc<InMemoryStore>, Sweeper) {
        let store = Arc::new(InMemoryStore::new());
        store.set_registry(Chain::Eth, vec![Safe::new("A", 5, &[]), Safe::new("B", 10, &["A"])]).unwrap();
        let sweeper = Sweeper::new(Box::new(store.clone()));
        (store, sweeper)
    }

    fn nonces_of(store: &InMemoryStore, task: &str) -> BTreeMap<String, u64> {
        store
            .task(Chain::Eth, task)
            .unwrap()
            .unwrap()
            .nonces
            .into_iter()
            .map(|(k, v)| (k.0, v))
            .collect()
    }

    fn map(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn owner_chain_example() {
        let (store, sweeper) = setup();
        store.add_dir(Chain::Eth, "001-b", rec(Some("B"), false)).unwrap();
        store.add_dir(Chain::Eth, "002-a", rec(Some("A"), false)).unwrap();

        let report = sweeper.run(Chain::Eth, SweepMode::Write).unwrap();
        assert_eq!(nonces_of(&store, "001-b"), map(&[("A", 5), ("B", 10)]));
        assert_eq!(nonces_of(&store, "002-a"), map(&[("A", 6)]));
        assert_eq!(report.next_nonces.get(&SafeName::from("A")), Some(&7));
        assert_eq!(report.next_nonces.get(&SafeName::from("B")), Some(&11));
    }

    #[test]
    fn executed_task_is_left_alone() {
        let (store, sweeper) = setup();
        let mut done = rec(Some("B"), true).unwrap();
        done.nonces.insert("B".into(), 2);
        store.add_dir(Chain::Eth, "001-done", Some(done.clone())).unwrap();
        store.add_dir(Chain::Eth, "002-a", rec(Some("A"), false)).unwrap();

        let report = sweeper.run(Chain::Eth, SweepMode::Write).unwrap();
        assert_eq!(store.task(Chain::Eth, "001-done").unwrap(), Some(done));
        assert_eq!(nonces_of(&store, "002-a"), map(&[("A", 5)]));
        assert_eq!(
            report.tasks[0],
            TaskOutcome::Skipped { task: "001-done".into(), reason: SkipReason::Executed }
        );
        assert_eq!(store.writes().unwrap(), vec![TaskName::from("002-a")]);
    }

    #[test]
    fn unknown_safe_aborts_and_keeps_earlier_writes() {
        let (store, sweeper) = setup();
        store.add_dir(Chain::Eth, "001-a", rec(Some("A"), false)).unwrap();
        store.add_dir(Chain::Eth, "002-c", rec(Some("C"), false)).unwrap();
        store.add_dir(Chain::Eth, "003-b", rec(Some("B"), false)).unwrap();

        let err = sweeper.run(Chain::Eth, SweepMode::Write).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SweepError>(),
            Some(&SweepError::UnknownSafe { task: "002-c".into(), safe: "C".into() })
        );
        assert_eq!(nonces_of(&store, "001-a"), map(&[("A", 5)]));
        assert!(nonces_of(&store, "003-b").is_empty());
    }

    #[test]
    fn missing_registry_is_fatal_before_any_write() {
        let store = Arc::new(InMemoryStore::new());
        store.add_dir(Chain::Sep, "001-a", rec(Some("A"), false)).unwrap();
        let sweeper = Sweeper::new(Box::new(store.clone()));

        let err = sweeper.run(Chain::Sep, SweepMode::Write).unwrap_err();
        assert!(matches!(err.downcast_ref::<SweepError>(), Some(SweepError::MissingRegistry { chain: Chain::Sep, .. })));
        assert!(store.writes().unwrap().is_empty());
    }

    #[test]
    fn dry_run_reports_without_writing() {
        let (store, sweeper) = setup();
        store.add_dir(Chain::Eth, "001-b", rec(Some("B"), false)).unwrap();
        store.add_dir(Chain::Eth, "002-a", rec(Some("A"), false)).unwrap();

        let dry = sweeper.run(Chain::Eth, SweepMode::DryRun).unwrap();
        assert!(store.writes().unwrap().is_empty());
        assert!(dry.dry_run);

        let real = sweeper.run(Chain::Eth, SweepMode::Write).unwrap();
        assert_eq!(dry.tasks, real.tasks);
        assert_eq!(dry.next_nonces, real.next_nonces);
    }

    #[test]
    fn rerun_gives_the_same_nonces() {
        let (store, sweeper) = setup();
        store.add_dir(Chain::Eth, "001-b", rec(Some("B"), false)).unwrap();
        store.add_dir(Chain::Eth, "002-a", rec(Some("A"), false)).unwrap();
        store.add_dir(Chain::Eth, "003-b", rec(Some("B"), false)).unwrap();

        sweeper.run(Chain::Eth, SweepMode::Write).unwrap();
        let first: Vec<_> = ["001-b", "002-a", "003-b"].iter().map(|t| nonces_of(&store, t)).collect();
        sweeper.run(Chain::Eth, SweepMode::Write).unwrap();
        let second: Vec<_> = ["001-b", "002-a", "003-b"].iter().map(|t| nonces_of(&store, t)).collect();
        assert_eq!(first, second);
        assert_eq!(first[2], map(&[("A", 7), ("B", 11)]));
    }

    #[test]
    fn non_task_dirs_and_missing_fields_are_skipped() {
        let (store, sweeper) = setup();
        store.add_dir(Chain::Eth, "templates", rec(Some("A"), false)).unwrap();
        store.add_dir(Chain::Eth, "001-empty", None).unwrap();
        store.add_dir(Chain::Eth, "002-nosafe", rec(None, false)).unwrap();
        store.add_dir(Chain::Eth, "003-a", rec(Some("A"), false)).unwrap();

        let report = sweeper.run(Chain::Eth, SweepMode::Write).unwrap();
        let names: Vec<&str> = report.tasks.iter().map(|t| t.task().as_str()).collect();
        assert_eq!(names, vec!["001-empty", "002-nosafe", "003-a"]);
        assert_eq!(nonces_of(&store, "003-a"), map(&[("A", 5)]));
        assert!(nonces_of(&store, "templates").is_empty());
    }

    #[test]
    fn check_flags_cycles() {
        let store = InMemoryStore::new();
        store.set_registry(Chain::Eth, vec![Safe::new("A", 0, &["B"]), Safe::new("B", 0, &["A"])]).unwrap();
        let sweeper = Sweeper::new(Box::new(store));
        assert!(sweeper.check(Chain::Eth).is_err());
    }
}
