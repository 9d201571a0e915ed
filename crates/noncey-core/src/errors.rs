use thiserror::Error;

use crate::ids::{SafeName, TaskName};
use crate::model::Chain;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate safe in registry: {0}")]
    DuplicateSafe(SafeName),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("safe ownership contains a cycle: {}", fmt_path(.path))]
    Cycle { path: Vec<SafeName> },
}

/// Fatal conditions of a sweep. Writes made before one of these stay on disk.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SweepError {
    #[error("registry for chain {} not found at {location}", .chain.dir_name())]
    MissingRegistry { chain: Chain, location: String },
    #[error("task {task}: safe {safe} not found in registry")]
    UnknownSafe { task: TaskName, safe: SafeName },
    #[error("task {task}: cannot resolve involved safes")]
    Resolve {
        task: TaskName,
        #[source]
        source: ResolveError,
    },
}

fn fmt_path(path: &[SafeName]) -> String {
    path.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(" -> ")
}
