use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use stackpull::engine::CycleRunner;
use stackpull::orchestrator::BoxFuture;
use tokio::sync::{Notify, Semaphore};

struct Inner {
    gate: Semaphore,
    started: AtomicUsize,
    finished: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    entered: Notify,
}

/// A [`CycleRunner`] whose cycles block until the test releases them.
///
/// Each cycle consumes one permit; [`GatedRunner::release`] hands out
/// permits. Counts how many cycles started, finished and overlapped.
#[derive(Clone)]
pub struct GatedRunner {
    inner: Arc<Inner>,
}

impl GatedRunner {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                gate: Semaphore::new(0),
                started: AtomicUsize::new(0),
                finished: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                entered: Notify::new(),
            }),
        }
    }

    /// A runner that never blocks.
    pub fn open() -> Self {
        let runner = Self::new();
        runner.inner.gate.add_permits(Semaphore::MAX_PERMITS / 2);
        runner
    }

    /// Let `n` more cycles complete.
    pub fn release(&self, n: usize) {
        self.inner.gate.add_permits(n);
    }

    pub fn started(&self) -> usize {
        self.inner.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.inner.finished.load(Ordering::SeqCst)
    }

    /// Highest number of cycles seen running at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.inner.max_active.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` cycles have started.
    pub async fn wait_started(&self, n: usize) {
        loop {
            let notified = self.inner.entered.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.started() >= n {
                return;
            }
            notified.await;
        }
    }
}

impl Default for GatedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleRunner for GatedRunner {
    fn run_cycle(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let inner = &self.inner;

            let active = inner.active.fetch_add(1, Ordering::SeqCst) + 1;
            inner.max_active.fetch_max(active, Ordering::SeqCst);
            inner.started.fetch_add(1, Ordering::SeqCst);
            inner.entered.notify_waiters();

            if let Ok(permit) = inner.gate.acquire().await {
                permit.forget();
            }

            inner.active.fetch_sub(1, Ordering::SeqCst);
            inner.finished.fetch_add(1, Ordering::SeqCst);
        })
    }
}
