// src/orchestrator/mod.rs

//! Boundary to the container tooling.
//!
//! Everything above this module talks to an [`Orchestrator`] rather than to
//! processes directly, so detection and execution can be driven by a fake in
//! tests while production uses [`ComposeOrchestrator`].
//!
//! - [`output`] models streamed command output (`CommandRun`).
//! - [`process`] spawns subprocesses and wires their pipes.
//! - [`compose`] is the `docker compose` backed implementation.

pub mod compose;
pub mod output;
pub mod process;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::workload::WorkloadSpec;

pub use compose::ComposeOrchestrator;
pub use output::{CommandOutput, CommandRun, OutputLine, OutputStream};

/// Boxed, sendable future returned by [`Orchestrator`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Which workloads a stop / pull / start step applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartScope {
    /// The entire declared stack.
    WholeStack,
    /// Only the named workloads.
    Subset(Vec<String>),
}

impl RestartScope {
    /// Workload names to pass to the tooling; empty for the whole stack.
    pub fn names(&self) -> &[String] {
        match self {
            RestartScope::WholeStack => &[],
            RestartScope::Subset(names) => names,
        }
    }
}

impl fmt::Display for RestartScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartScope::WholeStack => f.write_str("whole stack"),
            RestartScope::Subset(names) => write!(f, "[{}]", names.join(", ")),
        }
    }
}

/// Operations the update engine needs from the container runtime.
///
/// Query methods return plain values. Methods that mutate the stack return a
/// [`CommandRun`] so callers can log output incrementally; a non-zero exit is
/// interpreted by the caller.
pub trait Orchestrator: Send + Sync {
    /// Current workload definitions, re-read on every call.
    fn list_workload_specs(&self) -> BoxFuture<'_, Result<Vec<WorkloadSpec>>>;

    /// Fetch the newest images for `workloads` (a registry pull).
    fn refresh_desired_state<'a>(
        &'a self,
        workloads: &'a [WorkloadSpec],
    ) -> BoxFuture<'a, Result<CommandRun>>;

    /// Digest of the local image `image` currently resolves to.
    fn inspect_image_digest<'a>(&'a self, image: &'a str) -> BoxFuture<'a, Result<String>>;

    /// Digest of the image the live instance of `workload` runs, or `None`
    /// if there is no live instance.
    fn inspect_running_digest<'a>(
        &'a self,
        workload: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>>>;

    fn stop_workloads<'a>(&'a self, scope: &'a RestartScope) -> BoxFuture<'a, Result<CommandRun>>;

    fn pull_workloads<'a>(&'a self, scope: &'a RestartScope) -> BoxFuture<'a, Result<CommandRun>>;

    fn start_workloads<'a>(&'a self, scope: &'a RestartScope) -> BoxFuture<'a, Result<CommandRun>>;
}
