// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, StackpullError};

/// Environment variable that overrides `[webhook].secret`.
pub const SECRET_ENV: &str = "STACKPULL_WEBHOOK_SECRET";

/// Load a settings file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a settings file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Applies the secret overrides (`STACKPULL_WEBHOOK_SECRET`,
///   `[webhook].secret_file`).
/// - Resolves `project_dir` relative to the file's directory.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw = load_from_path(path)?;
    finish(raw, &config_root_dir(path))
}

/// Entry point used by the CLI.
///
/// - An explicit path must exist.
/// - Without one, [`default_config_path`] is used if present, otherwise the
///   built-in defaults apply with the current directory as project.
pub fn load_or_default(explicit: Option<&Path>) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(StackpullError::ConfigError(format!(
                "settings file {:?} not found",
                path
            )));
        }
        return load_and_validate(path);
    }

    let default_path = default_config_path();
    if default_path.is_file() {
        return load_and_validate(&default_path);
    }

    debug!(path = ?default_path, "no settings file; using defaults");
    finish(RawConfigFile::default(), &config_root_dir(&default_path))
}

/// Default settings file: `Stackpull.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Stackpull.toml")
}

fn finish(mut raw: RawConfigFile, root: &Path) -> Result<ConfigFile> {
    apply_secret_overrides(&mut raw, root)?;

    let project_dir = match raw.config.project_dir.as_deref() {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => root.join(dir),
        None => root.to_path_buf(),
    };

    let mut cfg = ConfigFile::try_from(raw)?;
    cfg.set_project_dir(project_dir);
    Ok(cfg)
}

fn apply_secret_overrides(raw: &mut RawConfigFile, root: &Path) -> Result<()> {
    if let Ok(secret) = std::env::var(SECRET_ENV) {
        raw.webhook.secret = secret;
    }

    if let Some(file) = raw.webhook.secret_file.as_deref() {
        let path = if file.is_absolute() {
            file.to_path_buf()
        } else {
            root.join(file)
        };
        let secret = fs::read_to_string(&path).map_err(|e| {
            StackpullError::ConfigError(format!("reading webhook secret file {:?}: {e}", path))
        })?;
        raw.webhook.secret = secret.trim().to_string();
    }

    Ok(())
}

/// Directory the settings file lives in.
///
/// - If the path has a non-empty parent (e.g. "deploy/Stackpull.toml"),
///   we use that directory.
/// - If it's just a bare filename, we fall back to the current working
///   directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
