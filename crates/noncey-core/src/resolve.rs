use std::collections::BTreeSet;

use crate::errors::ResolveError;
use crate::ids::SafeName;
use crate::model::Registry;

/// Returns `safe` plus every direct and indirect owner of it.
///
/// Names that are not in the registry are leaves. A cyclic owner relation
/// is reported as [`ResolveError::Cycle`] with the offending path.
pub fn resolve(registry: &Registry, safe: &SafeName) -> Result<BTreeSet<SafeName>, ResolveError> {
    let mut involved = BTreeSet::new();
    let mut path = Vec::new();
    visit(registry, safe, &mut path, &mut involved)?;
    Ok(involved)
}

fn visit(
    registry: &Registry,
    name: &SafeName,
    path: &mut Vec<SafeName>,
    finished: &mut BTreeSet<SafeName>,
) -> Result<(), ResolveError> {
    if let Some(pos) = path.iter().position(|p| p == name) {
        let mut cycle = path[pos..].to_vec();
        cycle.push(name.clone());
        return Err(ResolveError::Cycle { path: cycle });
    }
    if finished.contains(name) {
        return Ok(());
    }

    path.push(name.clone());
    if let Some(safe) = registry.get(name) {
        for owner in &safe.owners {
            visit(registry, owner, path, finished)?;
        }
    }
    path.pop();

    finished.insert(name.clone());
    Ok(())
}

/// Problems found by walking every safe in a registry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistryAudit {
    /// One entry per distinct cycle.
    pub cycles: Vec<Vec<SafeName>>,
    /// `(safe, owner)` pairs where `owner` is not itself a registered safe.
    pub unknown_owners: Vec<(SafeName, SafeName)>,
}

pub fn audit_registry(registry: &Registry) -> RegistryAudit {
    let mut audit = RegistryAudit::default();
    for safe in registry.safes() {
        for owner in &safe.owners {
            if !registry.contains(owner) {
                audit.unknown_owners.push((safe.name.clone(), owner.clone()));
            }
        }
        if let Err(ResolveError::Cycle { path }) = resolve(registry, &safe.name) {
            if !audit.cycles.iter().any(|c| same_cycle(c, &path)) {
                audit.cycles.push(path);
            }
        }
    }
    audit
}

// Reported paths start and end on the same name, so the name sets identify the loop.
fn same_cycle(a: &[SafeName], b: &[SafeName]) -> bool {
    let set = |p: &[SafeName]| p.iter().cloned().collect::<BTreeSet<_>>();
    set(a) == set(b)
}
