use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use noncey_core::{Chain, SweepMode};
use noncey_store::TaskStore;
use noncey_store_fs::FsTaskStore;
use serde::Deserialize;

use crate::{SweepReport, Sweeper};

/// `expected.toml` of a fixture scenario.
#[derive(Debug, Deserialize)]
pub struct ScenarioExpected {
    pub chain: String,
    /// Substring of the error the sweep must fail with; absent means success.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub tasks: BTreeMap<String, ExpectedTask>,
}

#[derive(Debug, Deserialize)]
pub struct ExpectedTask {
    #[serde(default)]
    pub nonces: BTreeMap<String, u64>,
    /// Lines that must still be present in the task config after the sweep.
    #[serde(default)]
    pub keeps: Vec<String>,
}

#[derive(Debug)]
pub struct ScenarioResult {
    pub report: Option<SweepReport>,
    pub error: Option<String>,
    /// Nonces read back from every task config after the sweep.
    pub nonces: BTreeMap<String, BTreeMap<String, u64>>,
    /// Raw task config text after the sweep.
    pub configs: BTreeMap<String, String>,
}

pub fn load_expected(dir: &Path) -> Result<ScenarioExpected> {
    let p = dir.join("expected.toml");
    let s = std::fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    let exp: ScenarioExpected = toml::from_str(&s).with_context(|| format!("parse {}", p.display()))?;
    Ok(exp)
}

/// Fixture-mode scenario run:
/// - copies `<dir>/tree` into `work` (the fixture itself is never modified)
/// - runs one write sweep for the expected chain over the copy
/// - reads every task config back
pub fn simulate(dir: &Path, work: &Path) -> Result<ScenarioResult> {
    let exp = load_expected(dir)?;
    let chain = Chain::parse(&exp.chain).ok_or_else(|| anyhow!("unknown chain in expected.toml: {}", exp.chain))?;
    copy_tree(&dir.join("tree"), work)?;

    let sweeper = Sweeper::new(Box::new(FsTaskStore::new(work.to_path_buf())));
    let (report, error) = match sweeper.run(chain, SweepMode::Write) {
        Ok(r) => (Some(r), None),
        Err(e) => (None, Some(format!("{:#}", e))),
    };

    let store = FsTaskStore::new(work.to_path_buf());
    let mut nonces = BTreeMap::new();
    let mut configs = BTreeMap::new();
    for name in store.list_task_dirs(chain)? {
        let task = name.as_str().into();
        let Some(record) = store.load_task(chain, &task)? else { continue };
        let path = store.task_path(chain, &task);
        configs.insert(name.clone(), std::fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?);
        nonces.insert(name, record.nonces.into_iter().map(|(k, v)| (k.0, v)).collect());
    }

    Ok(ScenarioResult { report, error, nonces, configs })
}

fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    std::fs::create_dir_all(to).with_context(|| format!("create {}", to.display()))?;
    for entry in std::fs::read_dir(from).with_context(|| format!("read dir {}", from.display()))? {
        let entry = entry?;
        let dest = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &dest)?;
        } else {
            std::fs::copy(entry.path(), &dest).with_context(|| format!("copy to {}", dest.display()))?;
        }
    }
    Ok(())
}
