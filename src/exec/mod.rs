// src/exec/mod.rs

//! Update execution layer.
//!
//! Performs the stop / (pull) / start sequence for a restart scope through
//! the [`Orchestrator`](crate::orchestrator::Orchestrator), streaming each
//! command's output into the log.
//!
//! - [`executor`] owns the step sequencing and the best-effort policy.

pub mod executor;

pub use crate::orchestrator::RestartScope;
pub use executor::{
    ExecutionReport, ExecutionStep, StepOutcome, StepReport, UpdateExecutor, UpdatePlan,
};
