//! Browser automation against the Tsinghua self-service portal.
//!
//! Drives a headless Chromium over the DevTools protocol through one
//! end-to-end attempt: log in, check whether today's health report is already
//! on file, submit it if not, and re-verify that the submission stuck.
//!
//! The scheduler never sees any of this; it only receives the classified
//! result of [`PortalClient::attempt`].

mod client;
mod error;

pub use client::{Credentials, PortalClient};
pub use error::PortalError;
