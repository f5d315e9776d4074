//! # Control frames: adapter lifecycle events.
//!
//! A [`ControlFrame`] is emitted exactly once per lifecycle transition of an
//! adapter and is immutable after creation. Within one adapter's task the
//! control subsequence is always a valid path through the adapter state
//! machine:
//!
//! ```text
//! STARTING → (CONNECTING ⇄ CONNECTED/DISCONNECTED)* → [ERROR] → STOPPING
//! ```
//!
//! No frame is ever emitted after `STOPPING`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::frames::unix_millis_now;

/// Lifecycle transitions an adapter reports on the control bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlEvent {
    /// Task body entered; always the first frame of an instance.
    Starting,
    /// A connect attempt is beginning (connection-oriented adapters).
    Connecting,
    /// First successful read (polled) or successful connect+subscribe
    /// (connection-oriented).
    Connected,
    /// Clean disconnect beginning during shutdown.
    Disconnecting,
    /// Transport reported a disconnect, or the clean disconnect finished.
    Disconnected,
    /// Unrecovered failure inside the task; detail carried alongside.
    Error,
    /// Task body is exiting; always the last frame of an instance.
    Stopping,
}

/// Immutable lifecycle event record.
///
/// Owned by the bus once written; consumed by the (pass-through) control
/// drain. Serializes to the wire shape
/// `{"timestampCreatedMs": …, "sourceAdapterId": …, "event": …, "detail": …}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlFrame {
    /// Creation time, milliseconds since the Unix epoch.
    pub timestamp_created_ms: i64,
    /// Name of the adapter instance that produced the frame.
    pub source_adapter_id: Arc<str>,
    /// The lifecycle transition.
    pub event: ControlEvent,
    /// Optional error detail (set for [`ControlEvent::Error`]).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ControlFrame {
    /// Creates a frame timestamped now.
    pub fn new(source: impl Into<Arc<str>>, event: ControlEvent) -> Self {
        Self {
            timestamp_created_ms: unix_millis_now(),
            source_adapter_id: source.into(),
            event,
            detail: None,
        }
    }

    /// Attaches an error detail.
    #[inline]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
