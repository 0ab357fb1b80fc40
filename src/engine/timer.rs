// src/engine/timer.rs

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::coordinator::TriggerCoordinator;
use super::{wait_for_shutdown, TriggerReason};

/// Signal a cycle every `period` until shutdown.
///
/// The first tick fires one full period after spawning; startup issues its
/// own trigger. A tick delayed by a busy runtime is not followed by a burst.
pub fn spawn_timer(
    coordinator: TriggerCoordinator,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = interval_at(Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(period = ?period, "periodic checks enabled");

        loop {
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = ticks.tick() => {
                    debug!("timer tick");
                    coordinator.trigger(TriggerReason::Timer);
                }
            }
        }

        debug!("timer stopped");
    })
}
