//! Cooldown guard for operations the service briefly rejects while settling.
//!
//! A failed release pushes the unlock time `cooldown` into the future; every
//! acquisition before that point sleeps in `poll_interval` steps until it has
//! passed. A clean release clears both the unlock time and the error flag.

use crate::{Error, Result};
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayGuardConfig {
    pub cooldown: Duration,
    pub poll_interval: Duration,
}

impl Default for DelayGuardConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_millis(600),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl DelayGuardConfig {
    pub fn from_settings(settings: &crate::Settings) -> Self {
        Self {
            cooldown: settings.unlock_cooldown(),
            poll_interval: settings.guard_poll_interval(),
        }
    }
}

#[derive(Debug, Default)]
struct GuardState {
    next_unlock: Option<Instant>,
    error_occurred: bool,
}

#[derive(Debug)]
pub struct DelayGuard {
    cfg: DelayGuardConfig,
    state: Mutex<GuardState>,
}

impl Default for DelayGuard {
    fn default() -> Self {
        Self::new(DelayGuardConfig::default())
    }
}

impl DelayGuard {
    pub fn new(cfg: DelayGuardConfig) -> Self {
        Self {
            cfg,
            state: Mutex::new(GuardState::default()),
        }
    }

    pub fn config(&self) -> &DelayGuardConfig {
        &self.cfg
    }

    fn lock(&self) -> MutexGuard<'_, GuardState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Time left until the guard opens, if a cooldown is running.
    pub fn remaining(&self) -> Option<Duration> {
        let now = Instant::now();
        self.lock()
            .next_unlock
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    /// Whether the last release reported a failure.
    pub fn error_occurred(&self) -> bool {
        self.lock().error_occurred
    }

    fn step(&self, remaining: Duration) -> Duration {
        remaining.min(self.cfg.poll_interval.max(Duration::from_millis(1)))
    }

    pub async fn acquire(&self) -> DelayPermit<'_> {
        while let Some(remaining) = self.remaining() {
            debug!(remaining_ms = remaining.as_millis() as u64, "delay guard cooling down");
            tokio::time::sleep(self.step(remaining)).await;
        }
        DelayPermit::new(self)
    }

    /// Thread-blocking twin of [`acquire`](Self::acquire).
    pub fn acquire_blocking(&self) -> DelayPermit<'_> {
        while let Some(remaining) = self.remaining() {
            debug!(remaining_ms = remaining.as_millis() as u64, "delay guard cooling down");
            std::thread::sleep(self.step(remaining));
        }
        DelayPermit::new(self)
    }

    fn release(&self, failed: bool) {
        let mut st = self.lock();
        if failed {
            st.next_unlock = Some(Instant::now() + self.cfg.cooldown);
            st.error_occurred = true;
        } else {
            st.next_unlock = None;
            st.error_occurred = false;
        }
    }

    /// Repeat acquire/attempt until `op` ends with anything other than an
    /// error `is_cooldown` recognizes.
    pub async fn run<T, F, Fut, P>(&self, is_cooldown: P, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&Error) -> bool,
    {
        loop {
            let permit = self.acquire().await;
            match op().await {
                Err(err) if is_cooldown(&err) => {
                    debug!(error = %err, "guarded operation rejected, cooling down");
                    permit.fail();
                }
                outcome => {
                    permit.release();
                    return outcome;
                }
            }
        }
    }

    pub fn run_blocking<T, F, P>(&self, is_cooldown: P, mut op: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
        P: Fn(&Error) -> bool,
    {
        loop {
            let permit = self.acquire_blocking();
            match op() {
                Err(err) if is_cooldown(&err) => {
                    debug!(error = %err, "guarded operation rejected, cooling down");
                    permit.fail();
                }
                outcome => {
                    permit.release();
                    return outcome;
                }
            }
        }
    }
}

/// Scoped acquisition. Dropping it counts as a clean release.
#[must_use = "dropping the permit releases the guard immediately"]
#[derive(Debug)]
pub struct DelayPermit<'g> {
    guard: &'g DelayGuard,
    released: bool,
}

impl<'g> DelayPermit<'g> {
    fn new(guard: &'g DelayGuard) -> Self {
        Self {
            guard,
            released: false,
        }
    }

    pub fn release(mut self) {
        self.released = true;
        self.guard.release(false);
    }

    /// Release after a rejection and start the cooldown.
    pub fn fail(mut self) {
        self.released = true;
        self.guard.release(true);
    }
}

impl Drop for DelayPermit<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.guard.release(false);
        }
    }
}
