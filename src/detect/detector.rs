// src/detect/detector.rs

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{Result, StackpullError};
use crate::orchestrator::Orchestrator;
use crate::workload::{SelectionPolicy, WorkloadSpec};

use super::digest::DigestResolver;

/// Why a workload was (or was not) marked for update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionReason {
    /// Running instance uses a different image than the desired one.
    DigestChanged { desired: String, running: String },
    /// No live instance exists.
    NotRunning { desired: String },
    /// Running instance already uses the desired image.
    UpToDate { digest: String },
    /// Digest resolution failed; the workload is left alone this cycle.
    Skipped { error: String },
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionReason::DigestChanged { desired, running } => {
                write!(f, "digest changed ({running} -> {desired})")
            }
            DecisionReason::NotRunning { .. } => f.write_str("not running"),
            DecisionReason::UpToDate { .. } => f.write_str("up to date"),
            DecisionReason::Skipped { error } => write!(f, "skipped ({error})"),
        }
    }
}

/// Per-workload outcome of change detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDecision {
    pub workload: String,
    pub required: bool,
    pub reason: DecisionReason,
}

impl UpdateDecision {
    pub fn is_skipped(&self) -> bool {
        matches!(self.reason, DecisionReason::Skipped { .. })
    }
}

/// Aggregated result of one detection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    pub decisions: Vec<UpdateDecision>,
    pub any_required: bool,
    /// Whether the registry refresh ran (false when nothing was active).
    pub refreshed: bool,
}

impl Detection {
    /// Names of workloads with `required = true`, in decision order.
    pub fn required_workloads(&self) -> Vec<String> {
        self.decisions
            .iter()
            .filter(|d| d.required)
            .map(|d| d.workload.clone())
            .collect()
    }

    pub fn decision_for(&self, workload: &str) -> Option<&UpdateDecision> {
        self.decisions.iter().find(|d| d.workload == workload)
    }
}

/// Decides which workloads need a restart.
#[derive(Clone)]
pub struct ChangeDetector {
    orchestrator: Arc<dyn Orchestrator>,
}

impl fmt::Debug for ChangeDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeDetector").finish_non_exhaustive()
    }
}

impl ChangeDetector {
    pub fn new(orchestrator: Arc<dyn Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Run one detection pass.
    ///
    /// 1. Filter by `policy`; an empty active set returns immediately.
    /// 2. Refresh images for the whole active set in one call. Failure here
    ///    is a [`StackpullError::RefreshError`] and aborts the pass.
    /// 3. Resolve digests per workload; a failing workload is recorded as
    ///    skipped and the loop carries on.
    pub async fn detect(
        &self,
        workloads: &[WorkloadSpec],
        policy: &SelectionPolicy,
    ) -> Result<Detection> {
        let active = policy.select(workloads);
        if active.is_empty() {
            info!("no workloads to process based on the selection policy");
            return Ok(Detection::default());
        }

        self.refresh(&active).await?;

        info!(workloads = active.len(), "comparing workloads for updates");

        let resolver = DigestResolver::new(self.orchestrator.as_ref());
        let mut decisions = Vec::with_capacity(active.len());

        for workload in &active {
            debug!(workload = %workload.name, image = %workload.image, "checking workload");

            let decision = match resolver.resolve_pair(workload).await {
                Ok(pair) => {
                    let required = pair.requires_update();
                    let reason = match pair.running {
                        None => DecisionReason::NotRunning {
                            desired: pair.desired,
                        },
                        Some(running) if required => DecisionReason::DigestChanged {
                            desired: pair.desired,
                            running,
                        },
                        Some(running) => DecisionReason::UpToDate { digest: running },
                    };
                    UpdateDecision {
                        workload: workload.name.clone(),
                        required,
                        reason,
                    }
                }
                Err(err) => {
                    warn!(workload = %workload.name, error = %err, "digest resolution failed; skipping workload");
                    UpdateDecision {
                        workload: workload.name.clone(),
                        required: false,
                        reason: DecisionReason::Skipped {
                            error: err.to_string(),
                        },
                    }
                }
            };

            decisions.push(decision);
        }

        let any_required = decisions.iter().any(|d| d.required);

        Ok(Detection {
            decisions,
            any_required,
            refreshed: true,
        })
    }

    async fn refresh(&self, active: &[WorkloadSpec]) -> Result<()> {
        info!(workloads = active.len(), "pulling latest images");

        let run = self
            .orchestrator
            .refresh_desired_state(active)
            .await
            .map_err(|e| StackpullError::RefreshError(e.to_string()))?;

        let output = run
            .follow()
            .await
            .map_err(|e| StackpullError::RefreshError(e.to_string()))?;

        if !output.success() {
            for line in &output.lines {
                warn!(command = %output.label, stream = %line.stream, "{}", line.text);
            }
            return Err(StackpullError::RefreshError(format!(
                "'{}' exited with code {}",
                output.label, output.exit_code
            )));
        }

        Ok(())
    }
}
