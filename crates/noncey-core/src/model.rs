use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::errors::RegistryError;
use crate::ids::SafeName;

/// Chains that carry a task tree.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Eth,
    Sep,
}

impl Chain {
    /// Directory name of the chain under the tasks root.
    pub fn dir_name(self) -> &'static str {
        match self {
            Chain::Eth => "eth",
            Chain::Sep => "sep",
        }
    }

    /// Accepts the short directory names and the long network names.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "eth" | "mainnet" => Some(Chain::Eth),
            "sep" | "sepolia" => Some(Chain::Sep),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Safe {
    pub name: SafeName,
    pub nonce: u64,
    #[serde(default)]
    pub owners: Vec<SafeName>,
}

impl Safe {
    pub fn new(name: &str, nonce: u64, owners: &[&str]) -> Self {
        Self {
            name: SafeName::from(name),
            nonce,
            owners: owners.iter().map(|o| SafeName::from(*o)).collect(),
        }
    }
}

/// All safes of one chain, in file order, with a name index.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    safes: Vec<Safe>,
    index: HashMap<SafeName, usize>,
}

impl Registry {
    pub fn new(safes: Vec<Safe>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(safes.len());
        for (i, s) in safes.iter().enumerate() {
            if index.insert(s.name.clone(), i).is_some() {
                return Err(RegistryError::DuplicateSafe(s.name.clone()));
            }
        }
        Ok(Self { safes, index })
    }

    pub fn get(&self, name: &SafeName) -> Option<&Safe> {
        self.index.get(name).map(|&i| &self.safes[i])
    }

    pub fn contains(&self, name: &SafeName) -> bool {
        self.index.contains_key(name)
    }

    pub fn safes(&self) -> &[Safe] {
        &self.safes
    }

    pub fn len(&self) -> usize {
        self.safes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.safes.is_empty()
    }
}

/// The parts of a task's config that drive the sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskRecord {
    pub safe: Option<SafeName>,
    pub executed: bool,
    pub nonces: BTreeMap<SafeName, u64>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoConfig,
    NoSafe,
    Executed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepMode {
    Write,
    DryRun,
}
