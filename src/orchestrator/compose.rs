// src/orchestrator/compose.rs

//! `docker compose` backed [`Orchestrator`].

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::config::ConfigFile;
use crate::errors::{Result, StackpullError};
use crate::fs::FileSystem;
use crate::workload::{discover_compose_file, load_workloads, workload_names, WorkloadSpec};

use super::process::{run_captured, spawn_streaming};
use super::{BoxFuture, CommandRun, Orchestrator, RestartScope};

/// Drives a compose project through the `docker` CLI.
///
/// All commands run with `project_dir` as working directory and pass the
/// resolved compose file explicitly via `-f`, so the tooling and
/// [`Orchestrator::list_workload_specs`] always agree on which file is used.
#[derive(Debug, Clone)]
pub struct ComposeOrchestrator {
    fs: Arc<dyn FileSystem>,
    project_dir: PathBuf,
    compose_file: Option<PathBuf>,
    compose_command: Vec<String>,
    docker_command: Vec<String>,
}

impl ComposeOrchestrator {
    pub fn new(fs: Arc<dyn FileSystem>, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            project_dir: project_dir.into(),
            compose_file: None,
            compose_command: vec!["docker".to_string(), "compose".to_string()],
            docker_command: vec!["docker".to_string()],
        }
    }

    pub fn from_config(cfg: &ConfigFile, fs: Arc<dyn FileSystem>) -> Self {
        Self::new(fs, cfg.project_dir.clone())
            .with_compose_file(cfg.config.compose_file.clone())
            .with_compose_command(cfg.config.compose_command.clone())
            .with_docker_command(cfg.config.docker_command.clone())
    }

    pub fn with_compose_file(mut self, compose_file: Option<PathBuf>) -> Self {
        self.compose_file = compose_file;
        self
    }

    pub fn with_compose_command(mut self, argv: Vec<String>) -> Self {
        self.compose_command = argv;
        self
    }

    pub fn with_docker_command(mut self, argv: Vec<String>) -> Self {
        self.docker_command = argv;
        self
    }

    fn compose_file(&self) -> Result<PathBuf> {
        discover_compose_file(
            self.fs.as_ref(),
            &self.project_dir,
            self.compose_file.as_deref(),
        )
    }

    fn compose_argv(&self, args: &[&str], names: &[String]) -> Result<Vec<String>> {
        let file = self.compose_file()?;
        let mut argv = self.compose_command.clone();
        argv.push("-f".to_string());
        argv.push(file.to_string_lossy().into_owned());
        argv.extend(args.iter().map(|s| s.to_string()));
        argv.extend(names.iter().cloned());
        Ok(argv)
    }

    fn docker_argv(&self, args: &[&str]) -> Vec<String> {
        let mut argv = self.docker_command.clone();
        argv.extend(args.iter().map(|s| s.to_string()));
        argv
    }

    fn stream(&self, label: &str, argv: Vec<String>) -> Result<CommandRun> {
        Ok(spawn_streaming(label, &argv, &self.project_dir)?)
    }

    /// Run a query command; any failure is a resolve error keyed by `subject`.
    async fn query(&self, subject: &str, argv: Vec<String>) -> Result<String> {
        let captured = run_captured(&argv, &self.project_dir)
            .await
            .map_err(|e| resolve_error(subject, format!("{e:#}")))?;

        if captured.exit_code != 0 {
            let stderr = captured.stderr.trim();
            return Err(resolve_error(
                subject,
                format!("{:?} exited with code {}: {}", argv, captured.exit_code, stderr),
            ));
        }

        Ok(captured.stdout)
    }
}

fn resolve_error(subject: &str, reason: String) -> StackpullError {
    StackpullError::ResolveError {
        workload: subject.to_string(),
        reason,
    }
}

impl Orchestrator for ComposeOrchestrator {
    fn list_workload_specs(&self) -> BoxFuture<'_, Result<Vec<WorkloadSpec>>> {
        Box::pin(async move {
            let path = self.compose_file()?;
            debug!(path = ?path, "reading workload definitions");
            load_workloads(self.fs.as_ref(), &path)
        })
    }

    fn refresh_desired_state<'a>(
        &'a self,
        workloads: &'a [WorkloadSpec],
    ) -> BoxFuture<'a, Result<CommandRun>> {
        Box::pin(async move {
            let argv = self.compose_argv(&["pull"], &workload_names(workloads))?;
            self.stream("compose pull", argv)
        })
    }

    fn inspect_image_digest<'a>(&'a self, image: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let argv = self.docker_argv(&["image", "inspect", "--format={{.Id}}", image]);
            let stdout = self.query(image, argv).await?;
            Ok(stdout.trim().to_string())
        })
    }

    fn inspect_running_digest<'a>(
        &'a self,
        workload: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            let argv = self.compose_argv(&["ps", "--format", "{{.Name}}"], &[workload.to_string()])?;
            let stdout = self.query(workload, argv).await?;

            let Some(container) = stdout.lines().map(str::trim).find(|l| !l.is_empty()) else {
                debug!(workload = %workload, "no live container");
                return Ok(None);
            };

            let argv = self.docker_argv(&["container", "inspect", "--format={{.Image}}", container]);
            let digest = self.query(workload, argv).await?;
            let digest = digest.trim();

            Ok((!digest.is_empty()).then(|| digest.to_string()))
        })
    }

    fn stop_workloads<'a>(&'a self, scope: &'a RestartScope) -> BoxFuture<'a, Result<CommandRun>> {
        Box::pin(async move {
            let (label, argv) = match scope {
                RestartScope::WholeStack => ("compose down", self.compose_argv(&["down"], &[])?),
                RestartScope::Subset(names) => ("compose stop", self.compose_argv(&["stop"], names)?),
            };
            self.stream(label, argv)
        })
    }

    fn pull_workloads<'a>(&'a self, scope: &'a RestartScope) -> BoxFuture<'a, Result<CommandRun>> {
        Box::pin(async move {
            let argv = self.compose_argv(&["pull"], scope.names())?;
            self.stream("compose pull", argv)
        })
    }

    fn start_workloads<'a>(&'a self, scope: &'a RestartScope) -> BoxFuture<'a, Result<CommandRun>> {
        Box::pin(async move {
            let argv = self.compose_argv(&["up", "-d"], scope.names())?;
            self.stream("compose up", argv)
        })
    }
}
