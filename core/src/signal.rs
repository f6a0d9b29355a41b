//! One-shot done signal.
//!
//! A [`DoneSignal`] starts unfired and fires at most once. Observers can poll
//! it, block on it (optionally with a timeout), or await it from async code.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;

/// Broadcast signal closed when a scope is canceled.
#[derive(Debug)]
pub struct DoneSignal {
    fired: AtomicBool,
    state: Mutex<bool>,
    cond: Condvar,
    notify: Notify,
}

impl DoneSignal {
    pub(crate) fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
            state: Mutex::new(false),
            cond: Condvar::new(),
            notify: Notify::new(),
        }
    }

    /// Shared signal that is already fired.
    ///
    /// Stored by a scope that is canceled before anyone asked for its
    /// signal, so an unfired signal is never observable after cancellation.
    pub(crate) fn closed() -> Arc<Self> {
        static CLOSED: OnceLock<Arc<DoneSignal>> = OnceLock::new();
        CLOSED
            .get_or_init(|| {
                let signal = DoneSignal::new();
                signal.fire();
                Arc::new(signal)
            })
            .clone()
    }

    /// Fire the signal, waking every waiter. Returns false if it had already fired.
    pub(crate) fn fire(&self) -> bool {
        let mut fired = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *fired {
            return false;
        }
        *fired = true;
        self.fired.store(true, Ordering::Release);
        self.cond.notify_all();
        self.notify.notify_waiters();
        true
    }

    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Block the current thread until the signal fires.
    pub fn wait(&self) {
        let mut fired = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        while !*fired {
            fired = self
                .cond
                .wait(fired)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block for at most `timeout`. Returns whether the signal fired.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let fired = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (fired, _) = self
            .cond
            .wait_timeout_while(fired, timeout, |fired| !*fired)
            .unwrap_or_else(PoisonError::into_inner);
        *fired
    }

    /// Wait asynchronously until the signal fires.
    pub async fn fired(&self) {
        loop {
            // Registered before the check so a concurrent fire cannot slip between.
            let notified = self.notify.notified();
            if self.is_fired() {
                return;
            }
            notified.await;
        }
    }
}
