// src/exec/executor.rs

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::errors::{Result, StackpullError};
use crate::orchestrator::{CommandRun, Orchestrator, OutputLine, RestartScope};

/// One step of a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStep {
    Stop,
    Pull,
    Start,
}

impl fmt::Display for ExecutionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStep::Stop => f.write_str("stop"),
            ExecutionStep::Pull => f.write_str("pull"),
            ExecutionStep::Start => f.write_str("start"),
        }
    }
}

/// What to restart and whether images still need pulling first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePlan {
    pub scope: RestartScope,
    /// `false` when the detector already refreshed the images this cycle.
    pub pull: bool,
}

impl UpdatePlan {
    pub fn steps(&self) -> Vec<ExecutionStep> {
        let mut steps = vec![ExecutionStep::Stop];
        if self.pull {
            steps.push(ExecutionStep::Pull);
        }
        steps.push(ExecutionStep::Start);
        steps
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,
    /// The command ran and exited non-zero.
    Failed { exit_code: i32 },
    /// The command could not be started or its status was lost.
    Errored(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: ExecutionStep,
    pub outcome: StepOutcome,
    pub output: Vec<OutputLine>,
}

impl StepReport {
    pub fn succeeded(&self) -> bool {
        self.outcome == StepOutcome::Succeeded
    }
}

/// Outcome of every attempted step, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub scope: Option<RestartScope>,
    pub steps: Vec<StepReport>,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        self.steps.iter().all(StepReport::succeeded)
    }

    pub fn first_failure(&self) -> Option<&StepReport> {
        self.steps.iter().find(|s| !s.succeeded())
    }

    pub fn attempted(&self) -> Vec<ExecutionStep> {
        self.steps.iter().map(|s| s.step).collect()
    }

    /// `Ok(self)` if all steps succeeded, otherwise an
    /// [`StackpullError::ExecutionError`] naming the first failed step.
    pub fn into_result(self) -> Result<Self> {
        match self.first_failure() {
            None => Ok(self),
            Some(failed) => Err(StackpullError::ExecutionError {
                step: failed.step.to_string(),
                exit_code: match failed.outcome {
                    StepOutcome::Failed { exit_code } => exit_code,
                    _ => -1,
                },
            }),
        }
    }
}

/// Runs restart plans, one step after another.
///
/// Steps are never parallelised. A failing step does not stop the sequence:
/// a failed stop is still followed by a start attempt, since a half-updated
/// stack is better than a stopped one.
#[derive(Clone)]
pub struct UpdateExecutor {
    orchestrator: Arc<dyn Orchestrator>,
}

impl fmt::Debug for UpdateExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateExecutor").finish_non_exhaustive()
    }
}

impl UpdateExecutor {
    pub fn new(orchestrator: Arc<dyn Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Run `plan` and fail with the first failed step, if any.
    pub async fn apply(&self, plan: &UpdatePlan) -> Result<ExecutionReport> {
        self.apply_with_report(plan).await.into_result()
    }

    /// Run `plan` and report every step, never short-circuiting.
    pub async fn apply_with_report(&self, plan: &UpdatePlan) -> ExecutionReport {
        info!(scope = %plan.scope, pull = plan.pull, "updating workloads");

        let mut report = ExecutionReport {
            scope: Some(plan.scope.clone()),
            steps: Vec::new(),
        };

        for step in plan.steps() {
            let step_report = self.run_step(step, &plan.scope).await;
            report.steps.push(step_report);
        }

        if report.is_success() {
            info!(scope = %plan.scope, "update finished");
        } else {
            warn!(scope = %plan.scope, failed = ?report.first_failure().map(|s| s.step), "update finished with errors");
        }

        report
    }

    async fn run_step(&self, step: ExecutionStep, scope: &RestartScope) -> StepReport {
        let launched = match step {
            ExecutionStep::Stop => self.orchestrator.stop_workloads(scope).await,
            ExecutionStep::Pull => self.orchestrator.pull_workloads(scope).await,
            ExecutionStep::Start => self.orchestrator.start_workloads(scope).await,
        };

        match launched {
            Ok(run) => follow_step(step, run).await,
            Err(err) => {
                error!(step = %step, error = %err, "failed to launch step");
                StepReport {
                    step,
                    outcome: StepOutcome::Errored(err.to_string()),
                    output: Vec::new(),
                }
            }
        }
    }
}

async fn follow_step(step: ExecutionStep, run: CommandRun) -> StepReport {
    let label = run.label().to_string();

    match run.follow().await {
        Ok(output) if output.success() => StepReport {
            step,
            outcome: StepOutcome::Succeeded,
            output: output.lines,
        },
        Ok(output) => {
            error!(step = %step, command = %label, exit_code = output.exit_code, "step failed");
            for line in &output.lines {
                warn!(step = %step, stream = %line.stream, "{}", line.text);
            }
            StepReport {
                step,
                outcome: StepOutcome::Failed {
                    exit_code: output.exit_code,
                },
                output: output.lines,
            }
        }
        Err(err) => {
            error!(step = %step, command = %label, error = %err, "lost track of step");
            StepReport {
                step,
                outcome: StepOutcome::Errored(err.to_string()),
                output: Vec::new(),
            }
        }
    }
}
