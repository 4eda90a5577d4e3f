//! The attempt runner: wait, attempt, classify, reschedule.

use std::time::Duration;

use chrono::{DateTime, Local};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{error, info, warn};

use crate::{AttemptError, AttemptFn, AttemptOutcome, Clock, Schedule};

/// Fixed sleep increment while waiting for the attempt window.
///
/// Waiting in coarse increments instead of one exact sleep keeps the loop
/// simple and bounds the scheduling drift to a single increment.
const WAIT_INCREMENT: Duration = Duration::from_secs(60);

/// Fixed delay between a transient failure and the retry.
const RETRY_DELAY: Duration = Duration::from_secs(10);

/// Drives one check-in attempt per day until a fatal failure.
///
/// The runner owns the single piece of long-lived state in the process: the
/// earliest wall-clock time the next attempt may run. Attempts never overlap;
/// each one fully completes (success or classified failure) before the next
/// is scheduled.
pub struct Runner<C: Clock> {
    schedule: Schedule,
    clock: C,
    attempt: AttemptFn,
    rng: StdRng,
    next_attempt: DateTime<Local>,
}

impl<C: Clock> Runner<C> {
    /// Create a runner whose first attempt is due immediately.
    pub fn new(schedule: Schedule, clock: C, attempt: AttemptFn) -> Self {
        let next_attempt = clock.now();
        Self {
            schedule,
            clock,
            attempt,
            rng: StdRng::from_entropy(),
            next_attempt,
        }
    }

    /// Delay the first attempt until `at` instead of running immediately.
    pub fn starting_at(mut self, at: DateTime<Local>) -> Self {
        self.next_attempt = at;
        self
    }

    /// Earliest wall-clock time the runner may make a new attempt.
    pub fn next_attempt(&self) -> DateTime<Local> {
        self.next_attempt
    }

    /// Run attempts forever, until one fails with a non-retryable error.
    ///
    /// Every completed attempt either advances the schedule to tomorrow's
    /// window (success, including "already submitted"), retries after a short
    /// fixed delay (transient failure), or returns the fatal error.
    pub async fn run(mut self) -> AttemptError {
        info!(next_attempt = %self.next_attempt, "runner started");

        loop {
            if self.clock.now() < self.next_attempt {
                self.clock.sleep(WAIT_INCREMENT).await;
                continue;
            }

            match (self.attempt)().await {
                Ok(outcome) => {
                    self.next_attempt = self.schedule.next_after(self.clock.now(), &mut self.rng);
                    match outcome {
                        AttemptOutcome::Submitted => {
                            info!(next_attempt = %self.next_attempt, "report submitted");
                        }
                        AttemptOutcome::AlreadyDone => {
                            info!(next_attempt = %self.next_attempt, "report already on file");
                        }
                    }
                }
                Err(AttemptError::Transient(reason)) => {
                    warn!(error = %reason, retry_in = ?RETRY_DELAY, "attempt failed, retrying");
                    self.clock.sleep(RETRY_DELAY).await;
                }
                Err(fatal @ AttemptError::Auth(_)) => {
                    error!(error = %fatal, "authentication rejected, stopping");
                    return fatal;
                }
            }
        }
    }
}
