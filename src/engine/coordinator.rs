// src/engine/coordinator.rs

//! Async shell around [`TriggerState`].
//!
//! One background worker runs update cycles. Every other context (timer,
//! webhook handler, startup) only calls [`TriggerCoordinator::trigger`],
//! which flips state under the lock, wakes the worker if needed and returns
//! immediately.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::orchestrator::BoxFuture;

use super::core::{CompletionDecision, CoordinatorSnapshot, Phase, TriggerDecision, TriggerState};
use super::{wait_for_shutdown, TriggerReason};

/// Something that performs one update cycle.
///
/// Errors are the runner's business: it must log them and return, so a
/// failed cycle never takes the worker down.
pub trait CycleRunner: Send + Sync + 'static {
    fn run_cycle(&self) -> BoxFuture<'_, ()>;
}

struct Shared {
    state: Mutex<TriggerState>,
    /// Wakes the idle worker. `notify_one` stores a permit, so a wake-up
    /// sent before the worker starts waiting is not lost.
    wake: Notify,
    /// Broadcast whenever the worker goes idle.
    idle: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, TriggerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable handle to the single-flight update worker.
#[derive(Clone)]
pub struct TriggerCoordinator {
    shared: Arc<Shared>,
}

impl fmt::Debug for TriggerCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerCoordinator")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl TriggerCoordinator {
    /// Spawn the worker on the current Tokio runtime.
    ///
    /// The worker exits once `shutdown` becomes `true` (or its sender is
    /// dropped), but only between cycles: a running cycle always completes,
    /// and a follow-up owed at that point is dropped.
    pub fn spawn<R: CycleRunner>(
        runner: R,
        shutdown: watch::Receiver<bool>,
    ) -> (Self, JoinHandle<()>) {
        let shared = Arc::new(Shared {
            state: Mutex::new(TriggerState::new()),
            wake: Notify::new(),
            idle: Notify::new(),
        });

        let handle = tokio::spawn(worker_loop(Arc::clone(&shared), runner, shutdown));

        (Self { shared }, handle)
    }

    /// Signal that an update cycle should run. Never blocks on the cycle.
    pub fn trigger(&self, reason: TriggerReason) -> TriggerDecision {
        let decision = self.shared.lock().on_trigger();

        match decision {
            TriggerDecision::StartCycle => {
                info!(%reason, "trigger received; starting update cycle");
                self.shared.wake.notify_one();
            }
            TriggerDecision::MarkedPending => {
                info!(%reason, "update cycle in progress; one follow-up scheduled");
            }
            TriggerDecision::Coalesced => {
                debug!(%reason, "follow-up already scheduled; trigger coalesced");
            }
        }

        decision
    }

    pub fn snapshot(&self) -> CoordinatorSnapshot {
        self.shared.lock().snapshot()
    }

    /// Resolve once no cycle is running or owed.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            // Register before checking, so a transition in between is seen.
            notified.as_mut().enable();

            if self.snapshot().phase == Phase::Idle {
                return;
            }
            notified.await;
        }
    }
}

async fn worker_loop<R: CycleRunner>(
    shared: Arc<Shared>,
    runner: R,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("update worker started");

    'worker: loop {
        tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown) => break,
            _ = shared.wake.notified() => {}
        }

        loop {
            let started = Instant::now();
            runner.run_cycle().await;

            let decision = shared.lock().on_cycle_complete();
            debug!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                ?decision,
                "update cycle finished"
            );

            match decision {
                CompletionDecision::RunAgain => {
                    if *shutdown.borrow() {
                        info!("shutdown requested; dropping follow-up cycle");
                        break 'worker;
                    }
                    info!("triggers arrived during the last cycle; running once more");
                }
                CompletionDecision::GoIdle => {
                    shared.idle.notify_waiters();
                    break;
                }
            }
        }
    }

    info!("update worker stopped");
}
