// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::RestartMode;

/// Command-line arguments for `stackpull`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stackpull",
    version,
    about = "Restart compose workloads when a newer image digest is available.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the settings file (TOML).
    ///
    /// When omitted, `Stackpull.toml` in the current directory is used if it
    /// exists; otherwise built-in defaults apply.
    #[arg(long, value_name = "PATH", env = "STACKPULL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Run a single update cycle and exit.
    #[arg(long)]
    pub once: bool,

    /// Override `[config].interval` (e.g. `30s`, `5m`).
    #[arg(long, value_name = "DURATION")]
    pub interval: Option<String>,

    /// Do not schedule periodic cycles; only webhook / startup triggers.
    #[arg(long)]
    pub no_timer: bool,

    /// Override `[config].restart_mode` (`whole-stack` or `subset`).
    #[arg(long, value_name = "MODE")]
    pub restart_mode: Option<RestartMode>,

    /// Enable the webhook listener on this address (overrides `[webhook].bind`).
    #[arg(long, value_name = "ADDR")]
    pub webhook_bind: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `STACKPULL_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load settings, workloads and policy, print them, but don't pull or
    /// restart anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides() {
        let args = CliArgs::try_parse_from([
            "stackpull",
            "--once",
            "--restart-mode",
            "subset",
            "--interval",
            "30s",
            "--webhook-bind",
            "127.0.0.1:9000",
        ])
        .unwrap();

        assert!(args.once);
        assert_eq!(args.restart_mode, Some(RestartMode::Subset));
        assert_eq!(args.interval.as_deref(), Some("30s"));
        assert_eq!(args.webhook_bind.as_deref(), Some("127.0.0.1:9000"));
        assert!(!args.dry_run);
    }
}
