//! Daily attempt scheduler for dailyreport.
//!
//! This crate owns the timing and retry policy around the check-in attempt:
//! - One attempt per day inside a configurable target window, plus jitter
//! - Short fixed backoff after transient failures
//! - Immediate halt on authentication rejection
//!
//! The attempt itself is an opaque async operation handed in by the caller;
//! the scheduler only sees its classified result.

mod clock;
mod error;
mod runner;
mod schedule;
mod types;

pub use clock::{Clock, SystemClock};
pub use error::{AttemptError, InvalidWindow};
pub use runner::Runner;
pub use schedule::Schedule;
pub use types::{AttemptFn, AttemptOutcome, AttemptResult};
