//! Adapters: supervised bridges from external data sources to the buses.
//!
//! Two variants exist, one per failure mode:
//! - [`PlcAdapter`] — polled-read: a tag sweep on an interval, with a
//!   backoff interval after timeouts and optional per-tag removal on error;
//! - [`BrokerAdapter`] — connection-oriented: a transport event loop with an
//!   unconditional reconnect per disconnect notification.
//!
//! Both own exactly one background task between `start` and a completed
//! `stop`, report every state transition as a control frame, and convert all
//! failures into frames inside the task — nothing propagates across the task
//! boundary.
//!
//! ## Lifecycle
//! ```text
//! start() ──► spawn task (own CancellationToken)
//!               │
//!               ├─► STARTING
//!               ├─► adapter-specific loop (CONNECTING/CONNECTED/...)
//!               ├─► [ERROR detail]        (unrecovered failure only)
//!               ├─► STOPPING              (always the last frame)
//!               └─► request process shutdown
//!
//! stop() ──► cancel token, join task      (idempotent; second call no-op)
//! ```

mod broker;
mod handle;
mod plc;

pub use broker::BrokerAdapter;
pub use handle::AdapterHandle;
pub use plc::PlcAdapter;

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::error::AdapterError;
use crate::frames::{BusSender, ControlEvent, ControlFrame, MessageFrame, MessagePayload};

/// Writes an adapter's outbound frames, stamping its instance id.
///
/// One emitter lives inside each adapter task; it is the only way frames
/// leave an adapter, which keeps them in program order per task.
#[derive(Clone)]
pub(crate) struct FrameEmitter {
    source: Arc<str>,
    control_tx: BusSender<ControlFrame>,
    message_tx: BusSender<MessageFrame>,
}

impl FrameEmitter {
    pub(crate) fn new(
        source: Arc<str>,
        control_tx: BusSender<ControlFrame>,
        message_tx: BusSender<MessageFrame>,
    ) -> Self {
        Self {
            source,
            control_tx,
            message_tx,
        }
    }

    /// Emits a lifecycle frame.
    pub(crate) fn control(&self, event: ControlEvent) {
        debug!(adapter = %self.source, ?event, "write frame: control");
        self.control_tx
            .publish(ControlFrame::new(self.source.clone(), event));
    }

    /// Emits a lifecycle frame with an error detail.
    pub(crate) fn control_with_detail(&self, event: ControlEvent, detail: &str) {
        debug!(adapter = %self.source, ?event, detail, "write frame: control");
        self.control_tx
            .publish(ControlFrame::new(self.source.clone(), event).with_detail(detail));
    }

    /// Emits a data frame.
    pub(crate) fn message(&self, payload: MessagePayload) {
        debug!(adapter = %self.source, "write frame: message");
        self.message_tx
            .publish(MessageFrame::new(self.source.clone(), payload));
    }
}

/// Runs an adapter's loop with panic isolation.
///
/// A panic inside a driver call is an unhandled failure like any other: it
/// becomes [`AdapterError::Fatal`], so the caller still emits `ERROR` and
/// `STOPPING` and requests process shutdown instead of the task dying
/// silently.
pub(crate) async fn run_isolated<T, F>(fut: F) -> Result<T, AdapterError>
where
    F: Future<Output = Result<T, AdapterError>>,
{
    match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic_err) => {
            let error = {
                let any = &*panic_err;
                if let Some(msg) = any.downcast_ref::<&'static str>() {
                    (*msg).to_string()
                } else if let Some(msg) = any.downcast_ref::<String>() {
                    msg.clone()
                } else {
                    "unknown panic".to_string()
                }
            };
            Err(AdapterError::Fatal { error })
        }
    }
}

/// Shared task epilogue: converts the loop outcome into final frames.
///
/// - clean exit or cancellation → `STOPPING` only (cancellation is expected,
///   not an error);
/// - fatal error → `ERROR` with the detail, then `STOPPING`.
///
/// `STOPPING` is always emitted and always last.
pub(crate) fn emit_exit_frames(emitter: &FrameEmitter, outcome: Result<(), AdapterError>) {
    match outcome {
        Ok(()) => {}
        Err(AdapterError::Canceled) => {
            warn!(adapter = %emitter.source, "adapter task cancelled");
        }
        Err(AdapterError::Fatal { error }) => {
            error!(adapter = %emitter.source, %error, "adapter task failed");
            emitter.control_with_detail(ControlEvent::Error, &error);
        }
    }
    info!(adapter = %emitter.source, "adapter task stopping");
    emitter.control(ControlEvent::Stopping);
}
