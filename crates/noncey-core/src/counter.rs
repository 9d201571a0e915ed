use std::collections::{BTreeMap, BTreeSet};

use crate::ids::SafeName;
use crate::model::Registry;

/// Next nonce to hand out per safe. Lives for exactly one sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NonceCounter {
    next: BTreeMap<SafeName, u64>,
}

impl NonceCounter {
    pub fn from_registry(registry: &Registry) -> Self {
        let next = registry.safes().iter().map(|s| (s.name.clone(), s.nonce)).collect();
        Self { next }
    }

    pub fn current(&self, safe: &SafeName) -> Option<u64> {
        self.next.get(safe).copied()
    }

    /// Snapshot the current values for `involved`, then bump each by one.
    ///
    /// Nothing is bumped if any involved safe has no baseline; the first such
    /// name is returned as the error.
    pub fn take(&mut self, involved: &BTreeSet<SafeName>) -> Result<BTreeMap<SafeName, u64>, SafeName> {
        let mut assigned = BTreeMap::new();
        for safe in involved {
            match self.next.get(safe) {
                Some(&n) => {
                    assigned.insert(safe.clone(), n);
                }
                None => return Err(safe.clone()),
            }
        }
        for safe in involved {
            if let Some(n) = self.next.get_mut(safe) {
                *n += 1;
            }
        }
        Ok(assigned)
    }

    pub fn into_values(self) -> BTreeMap<SafeName, u64> {
        self.next
    }
}
