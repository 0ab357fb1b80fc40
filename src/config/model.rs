// src/config/model.rs

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::RestartMode;

/// Settings file as read from TOML.
///
/// ```toml
/// [config]
/// interval = "5m"
/// restart_mode = "whole-stack"
/// policy_file = "stackpull.yml"
///
/// [webhook]
/// enabled = true
/// bind = "0.0.0.0:8080"
/// secret = "change-me"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub webhook: WebhookSection,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Period of the timer trigger, e.g. `"5m"`.
    #[serde(default = "default_interval")]
    pub interval: String,

    /// `"whole-stack"` (default) or `"subset"`.
    #[serde(default)]
    pub restart_mode: RestartMode,

    /// Directory of the compose project. Relative paths are resolved
    /// against the settings file's directory; defaults to that directory.
    #[serde(default)]
    pub project_dir: Option<PathBuf>,

    /// Explicit compose file; when unset the usual names are probed.
    #[serde(default)]
    pub compose_file: Option<PathBuf>,

    /// Include/exclude policy file, relative to the project directory.
    #[serde(default = "default_policy_file")]
    pub policy_file: PathBuf,

    /// Command prefix for compose operations.
    #[serde(default = "default_compose_command")]
    pub compose_command: Vec<String>,

    /// Command prefix for image/container inspection.
    #[serde(default = "default_docker_command")]
    pub docker_command: Vec<String>,
}

fn default_interval() -> String {
    "5m".to_string()
}

fn default_policy_file() -> PathBuf {
    PathBuf::from("stackpull.yml")
}

fn default_compose_command() -> Vec<String> {
    vec!["docker".to_string(), "compose".to_string()]
}

fn default_docker_command() -> Vec<String> {
    vec!["docker".to_string()]
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            restart_mode: RestartMode::default(),
            project_dir: None,
            compose_file: None,
            policy_file: default_policy_file(),
            compose_command: default_compose_command(),
            docker_command: default_docker_command(),
        }
    }
}

/// `[webhook]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookSection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_bind")]
    pub bind: String,

    /// Shared HMAC secret. Empty means the endpoint is open.
    #[serde(default)]
    pub secret: String,

    /// File holding the secret (Docker-style secrets); wins over `secret`.
    #[serde(default)]
    pub secret_file: Option<PathBuf>,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for WebhookSection {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: default_bind(),
            secret: String::new(),
            secret_file: None,
        }
    }
}

/// Validated settings.
///
/// Only constructed through `TryFrom<RawConfigFile>` (or the loader), so the
/// parsed `interval` / `webhook_bind` always agree with the raw strings.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub webhook: WebhookSection,
    /// Resolved compose project directory.
    pub project_dir: PathBuf,
    pub interval: Duration,
    pub webhook_bind: SocketAddr,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        webhook: WebhookSection,
        project_dir: PathBuf,
        interval: Duration,
        webhook_bind: SocketAddr,
    ) -> Self {
        Self {
            config,
            webhook,
            project_dir,
            interval,
            webhook_bind,
        }
    }

    /// Absolute-or-project-relative path of the selection policy file.
    pub fn policy_path(&self) -> PathBuf {
        self.project_dir.join(&self.config.policy_file)
    }

    /// Change the project directory after loading (e.g. resolved against
    /// the settings file location).
    pub fn set_project_dir(&mut self, dir: PathBuf) {
        self.project_dir = dir;
    }
}
