//! Error types for the scheduler.

use thiserror::Error;

/// A completed attempt's failure, classified for the retry policy.
///
/// This is a closed set: the runner's dispatch is a total match over it, and
/// every failure the attempt routine can produce must collapse into one of
/// these two kinds before it reaches the runner.
#[derive(Debug, Clone, Error)]
pub enum AttemptError {
    /// The portal rejected the account credentials. Further attempts are
    /// pointless and risk a lockout, so the runner halts.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Anything transient: navigation timeouts, markup drift, a submission
    /// that did not show up on re-check. The runner retries after a short
    /// delay without advancing the daily schedule.
    #[error("attempt failed: {0}")]
    Transient(String),
}

/// Rejected daily-window configuration.
#[derive(Debug, Error)]
#[error("invalid daily window {hour:02}:{minute:02}")]
pub struct InvalidWindow {
    pub hour: u32,
    pub minute: u32,
}
