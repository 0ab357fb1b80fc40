// src/fs/mod.rs

//! Filesystem seam used for the compose and policy files.
//!
//! Both files are re-read on every cycle so external edits are picked up;
//! tests swap in [`mock::MockFileSystem`] to script those edits.

use std::fmt::Debug;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn is_file(&self, path: &Path) -> bool;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading file {:?}", path))
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Return the first of `candidates` (relative to `dir`) that exists as a file.
pub fn first_existing(
    fs: &dyn FileSystem,
    dir: &Path,
    candidates: &[&str],
) -> Option<std::path::PathBuf> {
    candidates
        .iter()
        .map(|name| dir.join(name))
        .find(|path| fs.is_file(path))
}

#[cfg(test)]
mod tests {
    use super::mock::MockFileSystem;
    use super::*;

    #[test]
    fn first_existing_respects_candidate_order() {
        let fs = MockFileSystem::new();
        fs.add_file("proj/b.yml", "b");
        fs.add_file("proj/c.yml", "c");

        let found = first_existing(&fs, Path::new("proj"), &["a.yml", "b.yml", "c.yml"]);
        assert_eq!(found, Some(Path::new("proj/b.yml").to_path_buf()));

        assert_eq!(first_existing(&fs, Path::new("other"), &["b.yml"]), None);
    }
}
