use anyhow::Result;
use noncey_core::{audit_registry, Registry, ResolveError, SafeName};
use tracing::warn;

/// Outcome of a registry check that found no cycles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryCheck {
    pub safes: usize,
    /// `(safe, owner)` pairs naming an owner that has no registry entry.
    pub unknown_owners: Vec<(SafeName, SafeName)>,
}

/// Cycles are errors. Owners missing from the registry are only warned about here;
/// a sweep fails once such an owner is involved in a task.
pub fn check_registry(registry: &Registry) -> Result<RegistryCheck> {
    let audit = audit_registry(registry);
    if let Some(path) = audit.cycles.first() {
        let n = audit.cycles.len();
        return Err(anyhow::Error::new(ResolveError::Cycle { path: path.clone() })
            .context(format!("{} ownership cycle(s) in registry", n)));
    }
    for (safe, owner) in &audit.unknown_owners {
        warn!(safe = %safe, owner = %owner, "owner is not in the registry");
    }
    Ok(RegistryCheck { safes: registry.len(), unknown_owners: audit.unknown_owners })
}

#[cfg(test)]
mod tests {
    use super::*;
    use noncey_core::Safe;

    #[test]
    fn clean_registry_passes() {
        let reg = Registry::new(vec![Safe::new("A", 5, &[]), Safe::new("B", 10, &["A"])]).unwrap();
        let check = check_registry(&reg).unwrap();
        assert_eq!(check.safes, 2);
        assert!(check.unknown_owners.is_empty());
    }

    #[test]
    fn unknown_owner_is_reported_not_fatal() {
        let reg = Registry::new(vec![Safe::new("A", 5, &["ghost"])]).unwrap();
        let check = check_registry(&reg).unwrap();
        assert_eq!(check.unknown_owners, vec![(SafeName::from("A"), SafeName::from("ghost"))]);
    }

    #[test]
    fn cycle_is_fatal_and_names_the_path() {
        let reg = Registry::new(vec![Safe::new("A", 0, &["B"]), Safe::new("B", 0, &["A"])]).unwrap();
        let err = check_registry(&reg).unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("1 ownership cycle(s) in registry"), "{}", msg);
        assert!(msg.contains("A -> B -> A"), "{}", msg);
        assert!(err.downcast_ref::<ResolveError>().is_some());
    }
}
