// src/workload/compose.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::errors::{Result, StackpullError};
use crate::fs::{first_existing, FileSystem};

use super::WorkloadSpec;

/// File names probed, in order, when no compose file is configured.
pub const COMPOSE_FILE_CANDIDATES: &[&str] = &[
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// The only part of a compose file we care about.
#[derive(Debug, Deserialize)]
struct ComposeFile {
    #[serde(default)]
    services: BTreeMap<String, ComposeService>,
}

#[derive(Debug, Deserialize)]
struct ComposeService {
    #[serde(default)]
    image: Option<String>,
}

/// Locate the compose file: the explicit one if given (it must exist),
/// otherwise the first of [`COMPOSE_FILE_CANDIDATES`] inside `project_dir`.
pub fn discover_compose_file(
    fs: &dyn FileSystem,
    project_dir: &Path,
    explicit: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            project_dir.join(path)
        };
        if !fs.is_file(&path) {
            return Err(StackpullError::ConfigError(format!(
                "compose file {:?} does not exist",
                path
            )));
        }
        return Ok(path);
    }

    first_existing(fs, project_dir, COMPOSE_FILE_CANDIDATES).ok_or_else(|| {
        StackpullError::ConfigError(format!(
            "no compose file found in {:?} (tried {})",
            project_dir,
            COMPOSE_FILE_CANDIDATES.join(", ")
        ))
    })
}

/// Read and parse the compose file at `path`.
pub fn load_workloads(fs: &dyn FileSystem, path: &Path) -> Result<Vec<WorkloadSpec>> {
    let contents = fs.read_to_string(path).map_err(|e| {
        StackpullError::ConfigError(format!("reading compose file {:?}: {e:#}", path))
    })?;
    parse_workloads(&contents)
}

/// Parse compose YAML into workload specs, ordered by service name.
///
/// Services without an `image` (build-only services) have nothing to pull
/// and are left out.
pub fn parse_workloads(contents: &str) -> Result<Vec<WorkloadSpec>> {
    let compose: ComposeFile = serde_yaml::from_str(contents)
        .map_err(|e| StackpullError::ConfigError(format!("malformed compose file: {e}")))?;

    let mut workloads = Vec::with_capacity(compose.services.len());
    for (name, service) in compose.services {
        match service.image {
            Some(image) if !image.trim().is_empty() => {
                workloads.push(WorkloadSpec::new(name, image.trim()));
            }
            _ => debug!(workload = %name, "service has no image; not tracked"),
        }
    }

    Ok(workloads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    const COMPOSE: &str = r#"
services:
  web:
    image: nginx:1.27
    ports: ["80:80"]
  db:
    image: "postgres:16"
    environment:
      POSTGRES_PASSWORD: example
  builder:
    build: ./builder
"#;

    #[test]
    fn parses_services_with_images_only() {
        let workloads = parse_workloads(COMPOSE).unwrap();
        assert_eq!(
            workloads,
            vec![
                WorkloadSpec::new("db", "postgres:16"),
                WorkloadSpec::new("web", "nginx:1.27"),
            ]
        );
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let err = parse_workloads("services: [not, a, map").unwrap_err();
        assert!(matches!(err, StackpullError::ConfigError(_)));
    }

    #[test]
    fn discovery_prefers_docker_compose_yml() {
        let fs = MockFileSystem::new();
        fs.add_file("stack/compose.yaml", COMPOSE);
        fs.add_file("stack/docker-compose.yaml", COMPOSE);

        let found = discover_compose_file(&fs, Path::new("stack"), None).unwrap();
        assert_eq!(found, PathBuf::from("stack/docker-compose.yaml"));
    }

    #[test]
    fn discovery_without_any_file_fails() {
        let fs = MockFileSystem::new();
        let err = discover_compose_file(&fs, Path::new("stack"), None).unwrap_err();
        assert!(matches!(err, StackpullError::ConfigError(msg) if msg.contains("no compose file")));
    }

    #[test]
    fn explicit_compose_file_must_exist() {
        let fs = MockFileSystem::new();
        fs.add_file("stack/prod.yml", COMPOSE);

        let found =
            discover_compose_file(&fs, Path::new("stack"), Some(Path::new("prod.yml"))).unwrap();
        assert_eq!(found, PathBuf::from("stack/prod.yml"));

        assert!(
            discover_compose_file(&fs, Path::new("stack"), Some(Path::new("missing.yml")))
                .is_err()
        );
    }
}
