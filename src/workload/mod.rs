// src/workload/mod.rs

//! Declared workloads and the include/exclude selection policy.
//!
//! - [`compose`] turns a compose file into [`WorkloadSpec`]s.
//! - [`policy`] decides which of those workloads a cycle looks at.

pub mod compose;
pub mod policy;

pub use compose::{discover_compose_file, load_workloads, parse_workloads, COMPOSE_FILE_CANDIDATES};
pub use policy::{load_policy, SelectionPolicy};

/// One declared service: a unique name plus the image it should run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkloadSpec {
    pub name: String,
    pub image: String,
}

impl WorkloadSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
        }
    }
}

/// Names of `workloads`, in order.
pub fn workload_names(workloads: &[WorkloadSpec]) -> Vec<String> {
    workloads.iter().map(|w| w.name.clone()).collect()
}
