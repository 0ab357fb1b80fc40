// src/workload/policy.rs

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::errors::{Result, StackpullError};
use crate::fs::FileSystem;

use super::WorkloadSpec;

/// Which workloads a cycle is allowed to look at.
///
/// Read from a YAML mapping:
///
/// ```yaml
/// include: [web, api]
/// exclude: [db]
/// ```
///
/// `exclude` always wins. An empty `include` means "everything not
/// excluded".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SelectionPolicy {
    #[serde(default)]
    pub include: BTreeSet<String>,
    #[serde(default)]
    pub exclude: BTreeSet<String>,
}

impl SelectionPolicy {
    pub fn new<I, E, S, T>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            include: include.into_iter().map(Into::into).collect(),
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }

    /// The empty policy: every workload is active.
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn is_allow_all(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Decide a single workload name.
    pub fn allows(&self, name: &str) -> bool {
        if self.exclude.contains(name) {
            return false;
        }
        self.include.is_empty() || self.include.contains(name)
    }

    /// The active subset of `workloads`, order preserved.
    pub fn select(&self, workloads: &[WorkloadSpec]) -> Vec<WorkloadSpec> {
        workloads
            .iter()
            .filter(|w| {
                let allowed = self.allows(&w.name);
                if !allowed {
                    debug!(workload = %w.name, "skipping workload (selection policy)");
                }
                allowed
            })
            .cloned()
            .collect()
    }

    /// Policy entries that do not name any declared workload (likely typos).
    pub fn unknown_names<'a>(&'a self, workloads: &[WorkloadSpec]) -> Vec<&'a str> {
        self.include
            .iter()
            .chain(self.exclude.iter())
            .filter(|name| !workloads.iter().any(|w| &w.name == *name))
            .map(String::as_str)
            .collect()
    }
}

/// Load the selection policy from `path`.
///
/// An absent (or empty) file yields the allow-all policy.
pub fn load_policy(fs: &dyn FileSystem, path: &Path) -> Result<SelectionPolicy> {
    if !fs.is_file(path) {
        debug!(path = ?path, "no policy file; all workloads are active");
        return Ok(SelectionPolicy::allow_all());
    }

    let contents = fs.read_to_string(path).map_err(|e| {
        StackpullError::ConfigError(format!("reading policy file {:?}: {e:#}", path))
    })?;

    if contents.trim().is_empty() {
        return Ok(SelectionPolicy::allow_all());
    }

    serde_yaml::from_str(&contents).map_err(|e| {
        StackpullError::ConfigError(format!("malformed policy file {:?}: {e}", path))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn stack() -> Vec<WorkloadSpec> {
        vec![
            WorkloadSpec::new("web", "nginx"),
            WorkloadSpec::new("api", "api:latest"),
            WorkloadSpec::new("db", "postgres"),
        ]
    }

    fn names(workloads: &[WorkloadSpec]) -> Vec<&str> {
        workloads.iter().map(|w| w.name.as_str()).collect()
    }

    #[test]
    fn empty_policy_allows_everything() {
        let policy = SelectionPolicy::allow_all();
        assert!(policy.is_allow_all());
        assert_eq!(names(&policy.select(&stack())), vec!["web", "api", "db"]);
    }

    #[test]
    fn include_restricts_to_members() {
        let policy = SelectionPolicy::new(["api", "db"], Vec::<String>::new());
        assert_eq!(names(&policy.select(&stack())), vec!["api", "db"]);
    }

    #[test]
    fn exclude_dominates_include() {
        let policy = SelectionPolicy::new(["api", "db"], ["db"]);
        assert!(!policy.allows("db"));
        assert_eq!(names(&policy.select(&stack())), vec!["api"]);
    }

    #[test]
    fn unknown_names_are_reported() {
        let policy = SelectionPolicy::new(["web", "wbe"], ["cache"]);
        assert_eq!(policy.unknown_names(&stack()), vec!["wbe", "cache"]);
    }

    #[test]
    fn absent_or_empty_policy_file_is_allow_all() {
        let fs = MockFileSystem::new();
        assert_eq!(
            load_policy(&fs, Path::new("stackpull.yml")).unwrap(),
            SelectionPolicy::allow_all()
        );

        fs.add_file("stackpull.yml", "  \n");
        assert!(load_policy(&fs, Path::new("stackpull.yml")).unwrap().is_allow_all());
    }

    #[test]
    fn policy_file_is_parsed() {
        let fs = MockFileSystem::new();
        fs.add_file("stackpull.yml", "include:\n  - web\nexclude:\n  - db\n");

        let policy = load_policy(&fs, Path::new("stackpull.yml")).unwrap();
        assert_eq!(policy, SelectionPolicy::new(["web"], ["db"]));
    }

    #[test]
    fn malformed_policy_file_is_config_error() {
        let fs = MockFileSystem::new();
        fs.add_file("stackpull.yml", "include: {web: 1}\n");
        let err = load_policy(&fs, Path::new("stackpull.yml")).unwrap_err();
        assert!(matches!(err, StackpullError::ConfigError(_)));
    }
}
