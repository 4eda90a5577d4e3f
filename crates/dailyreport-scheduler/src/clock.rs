//! Injected time source.
//!
//! The runner never reads the wall clock or sleeps directly; it goes through
//! [`Clock`] so the waiting and backoff behavior can be driven deterministically
//! in tests.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};

/// Time source for the runner.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current local wall-clock time.
    fn now(&self) -> DateTime<Local>;

    /// Suspend the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// The production clock: real time, real sleeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
