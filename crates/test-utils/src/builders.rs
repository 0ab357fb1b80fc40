#![allow(dead_code)]

use stackpull::config::{ConfigFile, RawConfigFile};
use stackpull::types::RestartMode;
use stackpull::workload::WorkloadSpec;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_interval(mut self, interval: &str) -> Self {
        self.config.config.interval = interval.to_string();
        self
    }

    pub fn with_restart_mode(mut self, mode: RestartMode) -> Self {
        self.config.config.restart_mode = mode;
        self
    }

    pub fn with_policy_file(mut self, file: &str) -> Self {
        self.config.config.policy_file = file.into();
        self
    }

    pub fn with_compose_command(mut self, argv: &[&str]) -> Self {
        self.config.config.compose_command = argv.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_webhook(mut self, bind: &str, secret: &str) -> Self {
        self.config.webhook.enabled = true;
        self.config.webhook.bind = bind.to_string();
        self.config.webhook.secret = secret.to_string();
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for a list of `(name, image)` workloads.
pub fn workloads(specs: &[(&str, &str)]) -> Vec<WorkloadSpec> {
    specs
        .iter()
        .map(|(name, image)| WorkloadSpec::new(*name, *image))
        .collect()
}

/// Render a minimal compose file declaring `specs`.
pub fn compose_yaml(specs: &[(&str, &str)]) -> String {
    let mut out = String::from("services:\n");
    for (name, image) in specs {
        out.push_str(&format!("  {name}:\n    image: {image}\n"));
    }
    out
}
