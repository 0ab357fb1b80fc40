// src/engine/core.rs

//! Pure trigger state machine.
//!
//! Synchronous and deterministic: it owns the `running` / `pending` flags and
//! the counters, consumes "a trigger arrived" / "a cycle finished" and tells
//! the caller what to do next. The async shell
//! ([`TriggerCoordinator`](super::coordinator::TriggerCoordinator)) keeps it
//! behind a mutex and does the waking.
//!
//! Transitions:
//!
//! | phase                | trigger              | cycle finished       |
//! |----------------------|----------------------|----------------------|
//! | `Idle`               | `Running`, start     | n/a                  |
//! | `Running`            | `RunningWithPending` | `Idle`               |
//! | `RunningWithPending` | no-op (coalesced)    | `Running`, run again |

/// Externally visible phase of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    RunningWithPending,
}

/// What the caller must do after a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    /// Was idle: wake the worker.
    StartCycle,
    /// A cycle is running: one follow-up cycle is now owed.
    MarkedPending,
    /// A follow-up was already owed: nothing to do.
    Coalesced,
}

/// What the worker must do after finishing a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionDecision {
    RunAgain,
    GoIdle,
}

/// Counters plus phase, for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSnapshot {
    pub phase: Phase,
    pub triggers_received: u64,
    /// Triggers absorbed without starting a cycle of their own.
    pub triggers_coalesced: u64,
    pub cycles_started: u64,
    pub cycles_completed: u64,
}

#[derive(Debug, Default)]
pub struct TriggerState {
    running: bool,
    pending: bool,
    triggers_received: u64,
    triggers_coalesced: u64,
    cycles_started: u64,
    cycles_completed: u64,
}

impl TriggerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        match (self.running, self.pending) {
            (false, _) => Phase::Idle,
            (true, false) => Phase::Running,
            (true, true) => Phase::RunningWithPending,
        }
    }

    pub fn on_trigger(&mut self) -> TriggerDecision {
        self.triggers_received += 1;

        if !self.running {
            self.running = true;
            self.cycles_started += 1;
            return TriggerDecision::StartCycle;
        }

        self.triggers_coalesced += 1;
        if self.pending {
            TriggerDecision::Coalesced
        } else {
            self.pending = true;
            TriggerDecision::MarkedPending
        }
    }

    /// Record the end of a cycle.
    ///
    /// `pending` is cleared in the same critical section that decides to run
    /// again, so a trigger arriving right after sets it anew and is not lost.
    pub fn on_cycle_complete(&mut self) -> CompletionDecision {
        debug_assert!(self.running, "cycle completed while idle");
        self.cycles_completed += 1;

        if self.pending {
            self.pending = false;
            self.cycles_started += 1;
            CompletionDecision::RunAgain
        } else {
            self.running = false;
            CompletionDecision::GoIdle
        }
    }

    pub fn snapshot(&self) -> CoordinatorSnapshot {
        CoordinatorSnapshot {
            phase: self.phase(),
            triggers_received: self.triggers_received,
            triggers_coalesced: self.triggers_coalesced,
            cycles_started: self.cycles_started,
            cycles_completed: self.cycles_completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_trigger_starts_a_cycle() {
        let mut state = TriggerState::new();
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.on_trigger(), TriggerDecision::StartCycle);
        assert_eq!(state.phase(), Phase::Running);
    }

    #[test]
    fn triggers_while_running_collapse_into_one_follow_up() {
        let mut state = TriggerState::new();
        state.on_trigger();

        assert_eq!(state.on_trigger(), TriggerDecision::MarkedPending);
        for _ in 0..10 {
            assert_eq!(state.on_trigger(), TriggerDecision::Coalesced);
        }
        assert_eq!(state.phase(), Phase::RunningWithPending);

        assert_eq!(state.on_cycle_complete(), CompletionDecision::RunAgain);
        assert_eq!(state.phase(), Phase::Running);
        assert_eq!(state.on_cycle_complete(), CompletionDecision::GoIdle);
        assert_eq!(state.phase(), Phase::Idle);

        let snap = state.snapshot();
        assert_eq!(snap.triggers_received, 12);
        assert_eq!(snap.triggers_coalesced, 11);
        assert_eq!(snap.cycles_started, 2);
        assert_eq!(snap.cycles_completed, 2);
    }

    #[test]
    fn trigger_during_follow_up_owes_another_cycle() {
        let mut state = TriggerState::new();
        state.on_trigger();
        state.on_trigger();
        assert_eq!(state.on_cycle_complete(), CompletionDecision::RunAgain);

        // Arrives while the follow-up runs.
        assert_eq!(state.on_trigger(), TriggerDecision::MarkedPending);
        assert_eq!(state.on_cycle_complete(), CompletionDecision::RunAgain);
        assert_eq!(state.on_cycle_complete(), CompletionDecision::GoIdle);
        assert_eq!(state.snapshot().cycles_started, 3);
    }

    #[test]
    fn completion_without_pending_goes_idle() {
        let mut state = TriggerState::new();
        state.on_trigger();
        assert_eq!(state.on_cycle_complete(), CompletionDecision::GoIdle);
        assert_eq!(state.on_trigger(), TriggerDecision::StartCycle);
    }
}
