// src/engine/cycle.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::detect::{ChangeDetector, DecisionReason, Detection, UpdateDecision};
use crate::errors::Result;
use crate::exec::{ExecutionReport, UpdateExecutor, UpdatePlan};
use crate::fs::FileSystem;
use crate::orchestrator::{BoxFuture, Orchestrator, RestartScope};
use crate::types::RestartMode;
use crate::workload::load_policy;

use super::coordinator::CycleRunner;

/// Outcome of one detect-then-restart cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub decisions: Vec<UpdateDecision>,
    pub any_required: bool,
    /// `None` when nothing needed restarting.
    pub restarted: Option<ExecutionReport>,
}

impl CycleReport {
    fn from_detection(detection: Detection) -> Self {
        Self {
            any_required: detection.any_required,
            decisions: detection.decisions,
            restarted: None,
        }
    }
}

/// One-line human status for a decision.
pub fn status_line(decision: &UpdateDecision) -> String {
    match &decision.reason {
        DecisionReason::Skipped { error } => format!("{}: skipped ({error})", decision.workload),
        _ if decision.required => format!("{}: (!) update required", decision.workload),
        _ => format!("{}: up to date", decision.workload),
    }
}

/// Build the restart scope for the workloads that need it.
pub fn restart_scope(mode: RestartMode, required: Vec<String>) -> RestartScope {
    match mode {
        RestartMode::WholeStack => RestartScope::WholeStack,
        RestartMode::Subset => RestartScope::Subset(required),
    }
}

/// Everything a cycle needs. Workloads and policy are re-read per cycle so
/// edits on disk are picked up without a restart.
#[derive(Clone)]
pub struct UpdateCycle {
    orchestrator: Arc<dyn Orchestrator>,
    fs: Arc<dyn FileSystem>,
    policy_path: PathBuf,
    restart_mode: RestartMode,
}

impl fmt::Debug for UpdateCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateCycle")
            .field("policy_path", &self.policy_path)
            .field("restart_mode", &self.restart_mode)
            .finish_non_exhaustive()
    }
}

impl UpdateCycle {
    pub fn new(
        orchestrator: Arc<dyn Orchestrator>,
        fs: Arc<dyn FileSystem>,
        policy_path: PathBuf,
        restart_mode: RestartMode,
    ) -> Self {
        Self {
            orchestrator,
            fs,
            policy_path,
            restart_mode,
        }
    }

    pub async fn run_once(&self) -> Result<CycleReport> {
        let workloads = self.orchestrator.list_workload_specs().await?;
        let policy = load_policy(self.fs.as_ref(), &self.policy_path)?;

        for name in policy.unknown_names(&workloads) {
            warn!(workload = %name, "policy names a workload that is not defined");
        }

        let detector = ChangeDetector::new(Arc::clone(&self.orchestrator));
        let detection = detector.detect(&workloads, &policy).await?;

        for decision in &detection.decisions {
            info!("{}", status_line(decision));
        }

        let required = detection.required_workloads();
        let mut report = CycleReport::from_detection(detection);

        if !report.any_required {
            info!("all workloads up to date");
            return Ok(report);
        }

        let plan = UpdatePlan {
            scope: restart_scope(self.restart_mode, required),
            pull: false,
        };
        let executor = UpdateExecutor::new(Arc::clone(&self.orchestrator));
        report.restarted = Some(executor.apply_with_report(&plan).await);

        Ok(report)
    }
}

impl CycleRunner for UpdateCycle {
    fn run_cycle(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            match self.run_once().await {
                Ok(report) => {
                    if let Some(exec) = &report.restarted {
                        if let Err(err) = exec.clone().into_result() {
                            warn!(error = %err, "restart completed with failed steps");
                        }
                    }
                }
                Err(err) => error!(error = %err, "update cycle aborted"),
            }
        })
    }
}
