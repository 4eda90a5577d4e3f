//! Error types for the portal driver.

use std::time::Duration;

use thiserror::Error;

use dailyreport_scheduler::AttemptError;

/// Errors that can occur while driving the portal.
#[derive(Debug, Error)]
pub enum PortalError {
    /// Chromium could not be launched.
    #[error("failed to launch browser: {0}")]
    Launch(String),

    /// Error on the DevTools connection.
    #[error("browser error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),

    /// A page script ran but its result could not be read back.
    #[error("page script failed: {0}")]
    Script(String),

    /// The portal showed its login error banner.
    #[error("the portal rejected the account credentials")]
    AuthRejected,

    /// An expected element never appeared within the bounded wait.
    #[error("element never appeared: {selector}")]
    MissingElement { selector: String },

    /// The form iframe is gone; the page layout may have changed.
    #[error("form frame {name:?} not found, the page layout may have changed")]
    FrameMissing { name: String },

    /// The form never became ready within the bounded wait. The portal only
    /// pre-fills the address field when a previous report exists.
    #[error("form not populated within {waited:?}")]
    FormNeverReady { waited: Duration },

    /// The submission did not show up when the record list was re-checked.
    #[error("submission not reflected on re-check")]
    SubmitNotConfirmed,

    /// A submission record was present but unparseable.
    #[error("unrecognized submission record: {0:?}")]
    RecordFormat(String),
}

impl From<PortalError> for AttemptError {
    /// Collapse the driver taxonomy into the scheduler's closed set: only a
    /// rejected login is fatal, everything else is worth retrying.
    fn from(err: PortalError) -> Self {
        match err {
            PortalError::AuthRejected => AttemptError::Auth(err.to_string()),
            other => AttemptError::Transient(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_login_is_fatal() {
        let classified = AttemptError::from(PortalError::AuthRejected);
        assert!(matches!(classified, AttemptError::Auth(_)));
    }

    #[test]
    fn everything_else_is_retryable() {
        let errors = [
            PortalError::Launch("no chromium".to_string()),
            PortalError::Script("lost connection".to_string()),
            PortalError::MissingElement {
                selector: "#commit".to_string(),
            },
            PortalError::FrameMissing {
                name: "formIframe".to_string(),
            },
            PortalError::FormNeverReady {
                waited: Duration::from_secs(30),
            },
            PortalError::SubmitNotConfirmed,
            PortalError::RecordFormat("not a record".to_string()),
        ];
        for error in errors {
            assert!(matches!(AttemptError::from(error), AttemptError::Transient(_)));
        }
    }
}
