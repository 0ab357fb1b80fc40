// src/lib.rs

pub mod cli;
pub mod config;
pub mod detect;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod orchestrator;
pub mod types;
pub mod webhook;
pub mod workload;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_or_default, ConfigFile};
use crate::engine::{spawn_timer, TriggerCoordinator, TriggerReason, UpdateCycle};
use crate::fs::{FileSystem, RealFileSystem};
use crate::orchestrator::{ComposeOrchestrator, Orchestrator};
use crate::types::parse_duration;
use crate::webhook::{WebhookAuth, WebhookState};
use crate::workload::{discover_compose_file, load_policy, SelectionPolicy, WorkloadSpec};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings loading and CLI overrides
/// - the compose orchestrator
/// - the trigger coordinator and its update worker
/// - trigger sources (startup, timer, webhook)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let mut cfg = load_or_default(args.config.as_deref())?;
    apply_cli_overrides(&mut cfg, &args)?;

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let orchestrator: Arc<dyn Orchestrator> =
        Arc::new(ComposeOrchestrator::from_config(&cfg, Arc::clone(&fs)));

    // Broken definitions are fatal at startup; later cycles re-read them.
    let workloads = orchestrator.list_workload_specs().await?;
    let policy = load_policy(fs.as_ref(), &cfg.policy_path())?;

    if args.dry_run {
        let compose_file = discover_compose_file(
            fs.as_ref(),
            &cfg.project_dir,
            cfg.config.compose_file.as_deref(),
        )?;
        print_dry_run(&cfg, &compose_file, &workloads, &policy);
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let cycle = UpdateCycle::new(
        orchestrator,
        fs,
        cfg.policy_path(),
        cfg.config.restart_mode,
    );
    let (coordinator, worker) = TriggerCoordinator::spawn(cycle, shutdown_rx.clone());

    coordinator.trigger(TriggerReason::Manual);

    if args.once {
        coordinator.wait_idle().await;
        let _ = shutdown_tx.send(true);
        worker.await?;
        return Ok(());
    }

    let timer = if args.no_timer {
        info!("periodic checks disabled");
        None
    } else {
        Some(spawn_timer(
            coordinator.clone(),
            cfg.interval,
            shutdown_rx.clone(),
        ))
    };

    let server = if cfg.webhook.enabled {
        let listener = TcpListener::bind(cfg.webhook_bind)
            .await
            .with_context(|| format!("binding webhook listener on {}", cfg.webhook_bind))?;
        let state = WebhookState::new(
            coordinator.clone(),
            WebhookAuth::new(cfg.webhook.secret.clone()),
        );
        Some(tokio::spawn(webhook::serve_on(
            listener,
            state,
            shutdown_rx.clone(),
        )))
    } else {
        None
    };

    tokio::signal::ctrl_c()
        .await
        .context("listening for Ctrl-C")?;
    info!("shutdown requested; finishing in-flight work");
    let _ = shutdown_tx.send(true);

    if let Some(timer) = timer {
        timer.await?;
    }
    if let Some(server) = server {
        server.await??;
    }
    worker.await?;

    debug!(snapshot = ?coordinator.snapshot(), "coordinator stopped");
    Ok(())
}

/// Fold CLI flags into the loaded settings.
///
/// `--webhook-bind` implies the webhook is enabled.
pub fn apply_cli_overrides(cfg: &mut ConfigFile, args: &CliArgs) -> Result<()> {
    if let Some(ref raw) = args.interval {
        let interval = parse_duration(raw).map_err(|e| anyhow!("--interval: {e}"))?;
        if interval.is_zero() {
            return Err(anyhow!("--interval must be greater than zero"));
        }
        cfg.interval = interval;
        cfg.config.interval = raw.clone();
    }

    if let Some(mode) = args.restart_mode {
        cfg.config.restart_mode = mode;
    }

    if let Some(ref bind) = args.webhook_bind {
        let addr: SocketAddr = bind
            .parse()
            .map_err(|e| anyhow!("--webhook-bind {bind:?}: {e}"))?;
        cfg.webhook_bind = addr;
        cfg.webhook.bind = bind.clone();
        cfg.webhook.enabled = true;
    }

    Ok(())
}

/// Dry-run output: effective settings, workloads and what the policy keeps.
fn print_dry_run(
    cfg: &ConfigFile,
    compose_file: &Path,
    workloads: &[WorkloadSpec],
    policy: &SelectionPolicy,
) {
    println!("stackpull dry-run");
    println!("  project_dir = {}", cfg.project_dir.display());
    println!("  compose_file = {}", compose_file.display());
    println!("  policy_file = {}", cfg.policy_path().display());
    println!("  interval = {:?}", cfg.interval);
    println!("  restart_mode = {}", cfg.config.restart_mode);
    if cfg.webhook.enabled {
        let posture = if cfg.webhook.secret.is_empty() {
            "open"
        } else {
            "signed"
        };
        println!("  webhook = {} ({posture})", cfg.webhook_bind);
    } else {
        println!("  webhook = disabled");
    }
    println!();

    if !policy.include.is_empty() {
        println!("include: {:?}", policy.include);
    }
    if !policy.exclude.is_empty() {
        println!("exclude: {:?}", policy.exclude);
    }
    for name in policy.unknown_names(workloads) {
        println!("warning: policy names unknown workload {name:?}");
    }

    println!("workloads ({}):", workloads.len());
    for workload in workloads {
        let marker = if policy.allows(&workload.name) {
            "active"
        } else {
            "ignored"
        };
        println!("  - {} [{marker}]", workload.name);
        println!("      image: {}", workload.image);
    }

    debug!("dry-run complete (nothing pulled or restarted)");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawConfigFile;
    use crate::types::RestartMode;
    use clap::Parser;
    use std::time::Duration;

    fn defaults() -> ConfigFile {
        ConfigFile::try_from(RawConfigFile::default()).unwrap()
    }

    #[test]
    fn cli_overrides_replace_settings() {
        let mut cfg = defaults();
        let args = CliArgs::try_parse_from([
            "stackpull",
            "--interval",
            "30s",
            "--restart-mode",
            "subset",
            "--webhook-bind",
            "127.0.0.1:9000",
        ])
        .unwrap();

        apply_cli_overrides(&mut cfg, &args).unwrap();

        assert_eq!(cfg.interval, Duration::from_secs(30));
        assert_eq!(cfg.config.restart_mode, RestartMode::Subset);
        assert!(cfg.webhook.enabled);
        assert_eq!(cfg.webhook_bind.port(), 9000);
    }

    #[test]
    fn no_overrides_keep_defaults() {
        let mut cfg = defaults();
        let args = CliArgs::try_parse_from(["stackpull"]).unwrap();

        apply_cli_overrides(&mut cfg, &args).unwrap();

        assert_eq!(cfg.interval, Duration::from_secs(300));
        assert_eq!(cfg.config.restart_mode, RestartMode::WholeStack);
        assert!(!cfg.webhook.enabled);
    }

    #[test]
    fn bad_overrides_are_rejected() {
        let mut cfg = defaults();
        let args = CliArgs::try_parse_from(["stackpull", "--interval", "0s"]).unwrap();
        assert!(apply_cli_overrides(&mut cfg, &args).is_err());

        let args = CliArgs::try_parse_from(["stackpull", "--webhook-bind", "nope"]).unwrap();
        assert!(apply_cli_overrides(&mut cfg, &args).is_err());
    }
}
