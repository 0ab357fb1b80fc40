// src/config/validate.rs

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, StackpullError};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::StackpullError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let interval = validate_interval(&raw)?;
        let webhook_bind = validate_webhook(&raw)?;
        validate_commands(&raw)?;

        let project_dir = raw
            .config
            .project_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(ConfigFile::new_unchecked(
            raw.config,
            raw.webhook,
            project_dir,
            interval,
            webhook_bind,
        ))
    }
}

fn validate_interval(cfg: &RawConfigFile) -> Result<Duration> {
    let interval = parse_duration(&cfg.config.interval).map_err(|e| {
        StackpullError::ConfigError(format!("[config].interval: {e}"))
    })?;

    if interval.is_zero() {
        return Err(StackpullError::ConfigError(
            "[config].interval must be greater than zero".to_string(),
        ));
    }

    Ok(interval)
}

fn validate_webhook(cfg: &RawConfigFile) -> Result<SocketAddr> {
    cfg.webhook.bind.trim().parse().map_err(|e| {
        StackpullError::ConfigError(format!(
            "[webhook].bind '{}' is not a socket address: {e}",
            cfg.webhook.bind
        ))
    })
}

fn validate_commands(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.compose_command.is_empty() {
        return Err(StackpullError::ConfigError(
            "[config].compose_command must not be empty".to_string(),
        ));
    }
    if cfg.config.docker_command.is_empty() {
        return Err(StackpullError::ConfigError(
            "[config].docker_command must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RestartMode;

    #[test]
    fn defaults_validate() {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        assert_eq!(cfg.interval, Duration::from_secs(300));
        assert_eq!(cfg.config.restart_mode, RestartMode::WholeStack);
        assert_eq!(cfg.webhook_bind, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.policy_path(), PathBuf::from("./stackpull.yml"));
        assert!(!cfg.webhook.enabled);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.config.interval = "0s".to_string();
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(matches!(err, StackpullError::ConfigError(msg) if msg.contains("greater than zero")));
    }

    #[test]
    fn bad_bind_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.webhook.bind = "localhost".to_string();
        assert!(ConfigFile::try_from(raw).is_err());
    }

    #[test]
    fn empty_command_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.config.compose_command.clear();
        assert!(ConfigFile::try_from(raw).is_err());
    }
}
