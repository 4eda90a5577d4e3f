//! Attempt contract types.

use std::future::Future;
use std::pin::Pin;

use crate::AttemptError;

/// What a successful attempt found on the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The form was filled in and the new submission verified.
    Submitted,
    /// Today's report was already on file; nothing was sent.
    AlreadyDone,
}

/// Classified result of one full login-check-submit sequence.
pub type AttemptResult = Result<AttemptOutcome, AttemptError>;

/// Type alias for the attempt routine invoked by the runner.
pub type AttemptFn =
    Box<dyn Fn() -> Pin<Box<dyn Future<Output = AttemptResult> + Send>> + Send + Sync>;
