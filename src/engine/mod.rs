// src/engine/mod.rs

//! Update-trigger coordination for stackpull.
//!
//! This module ties together:
//! - the pure trigger state machine ([`core`])
//! - the single-flight worker that runs cycles ([`coordinator`])
//! - what a cycle actually does ([`cycle`])
//! - the periodic trigger source ([`timer`])
//!
//! The webhook trigger source lives in [`crate::webhook`].

use std::fmt;

use tokio::sync::watch;

/// Why a cycle was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Startup or `--once`.
    Manual,
    /// Periodic timer tick.
    Timer,
    /// Authenticated `POST /update`.
    Webhook,
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerReason::Manual => f.write_str("manual"),
            TriggerReason::Timer => f.write_str("timer"),
            TriggerReason::Webhook => f.write_str("webhook"),
        }
    }
}

/// Resolve once `rx` holds `true` or its sender is gone.
pub async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

pub mod coordinator;
pub mod core;
pub mod cycle;
pub mod timer;

pub use coordinator::{CycleRunner, TriggerCoordinator};
pub use self::core::{
    CompletionDecision, CoordinatorSnapshot, Phase, TriggerDecision, TriggerState,
};
pub use cycle::{CycleReport, UpdateCycle};
pub use timer::spawn_timer;
