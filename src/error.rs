//! Error types used by the gateway runtime, adapters, and drivers.
//!
//! This module defines three error enums:
//!
//! - [`DriverError`] — failures reported by the opaque protocol drivers
//!   (tag reads, broker connects).
//! - [`AdapterError`] — terminal outcomes of an adapter's background task.
//! - [`ConfigError`] — configuration rejected at load time.
//!
//! The split mirrors the failure taxonomy: a driver timeout is a *data-plane*
//! signal (drives backoff), cancellation is a *control-plane* signal (quiet
//! exit, never retried), and everything else either stays tag-local or is
//! fatal to the adapter.

use std::time::Duration;
use thiserror::Error;

/// # Errors reported by protocol driver calls.
///
/// Produced by [`TagHandle::read`](crate::drivers::TagHandle::read) and
/// [`BrokerDriver::connect`](crate::drivers::BrokerDriver::connect). The
/// adapter decides what each variant means for its own state machine.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DriverError {
    /// The driver call exceeded the configured timeout.
    ///
    /// For the polled adapter this sets the backoff flag and aborts the
    /// remainder of the current tag sweep; it never disables a tag and never
    /// produces an `ERROR` control frame.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// The call observed cancellation of the adapter's token.
    ///
    /// Not a failure: the adapter exits its loop quietly.
    #[error("cancelled")]
    Canceled,

    /// Any other driver-level failure (bad tag, refused connection, I/O).
    #[error("driver call failed: {error}")]
    Failed {
        /// The underlying driver message.
        error: String,
    },
}

impl DriverError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            DriverError::Timeout { .. } => "driver_timeout",
            DriverError::Canceled => "driver_canceled",
            DriverError::Failed { .. } => "driver_failed",
        }
    }

    /// True when this is a timeout-classified failure.
    ///
    /// Timeouts are the only failures that drive the polled adapter's
    /// backoff; every other error is handled per-tag or escalated.
    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout { .. })
    }
}

/// # Terminal outcomes of an adapter's background task.
///
/// An adapter task never propagates errors across the task boundary; it
/// converts them into control frames and finishes with one of these.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AdapterError {
    /// The task observed cancellation and exited cooperatively.
    ///
    /// Expected during shutdown; produces no `ERROR` frame.
    #[error("cancelled")]
    Canceled,

    /// An unrecovered failure inside the task body.
    ///
    /// Produces an `ERROR` control frame with the detail, then the usual
    /// `STOPPING` / process-shutdown path.
    #[error("adapter failed: {error}")]
    Fatal {
        /// Human-readable failure detail, carried into the `ERROR` frame.
        error: String,
    },
}

impl AdapterError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            AdapterError::Canceled => "adapter_canceled",
            AdapterError::Fatal { .. } => "adapter_fatal",
        }
    }
}

impl From<DriverError> for AdapterError {
    /// Driver cancellation stays cancellation; anything else that reaches the
    /// task boundary unhandled is fatal to the adapter.
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::Canceled => AdapterError::Canceled,
            other => AdapterError::Fatal {
                error: other.to_string(),
            },
        }
    }
}

/// # Configuration rejected at load time.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A tag referenced a mapper kind outside the fixed registry.
    ///
    /// Mapper kinds are resolved when configuration is loaded, not when the
    /// adapter starts; an unknown kind is an explicit error here.
    #[error("unknown mapper kind '{kind}' for tag '{tag}'")]
    UnknownMapper {
        /// The unrecognized mapper name.
        kind: String,
        /// The tag that referenced it.
        tag: String,
    },
}
