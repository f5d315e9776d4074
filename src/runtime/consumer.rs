//! # Bus consumers: the device-cache reader and the control drain.
//!
//! Each bus has exactly one reader. The [`CacheConsumer`] drains the message
//! bus and hands every frame to a [`FrameSink`] collaborator; anything
//! beyond receive-and-dispatch lives behind that trait. The [`ControlDrain`]
//! is the (currently pass-through) reader of the control bus: it logs each
//! lifecycle frame so control frames never accumulate.
//!
//! ## Exit rules
//! - Cancellation → quiet exit.
//! - Bus closure → drain whatever is buffered, exit, and (for the cache
//!   consumer) request process-wide shutdown: a dead consumer means the bus
//!   is no longer useful.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::adapters::AdapterHandle;
use crate::frames::{BusReceiver, ControlFrame, MessageFrame};
use crate::runtime::ShutdownRequester;

/// Where message frames go; the consumer's external collaborator.
#[async_trait]
pub trait FrameSink: Send + Sync + 'static {
    /// Handles one frame. Dispatch logic is the sink's business.
    async fn deliver(&self, frame: MessageFrame);
}

/// Pass-through sink: logs the frame and drops it.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl FrameSink for LogSink {
    async fn deliver(&self, frame: MessageFrame) {
        info!(
            source = %frame.source_adapter_id,
            timestamp = frame.timestamp_created_ms,
            payload = ?frame.payload,
            "receive frame"
        );
    }
}

/// Single reader of the message bus.
pub struct CacheConsumer {
    rx: Option<BusReceiver<MessageFrame>>,
    sink: Arc<dyn FrameSink>,
    shutdown: ShutdownRequester,
    handle: Option<AdapterHandle>,
}

impl CacheConsumer {
    /// Creates the consumer over the message bus's receive side.
    pub fn new(
        rx: BusReceiver<MessageFrame>,
        sink: Arc<dyn FrameSink>,
        shutdown: ShutdownRequester,
    ) -> Self {
        Self {
            rx: Some(rx),
            sink,
            shutdown,
            handle: None,
        }
    }

    /// Spawns the consumer task. No-op when already started.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            warn!("cache consumer already started");
            return;
        }
        let mut rx = match self.rx.take() {
            Some(rx) => rx,
            None => return,
        };
        let sink = Arc::clone(&self.sink);
        let shutdown = self.shutdown.clone();

        self.handle = Some(AdapterHandle::spawn(move |token| async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        warn!("cache consumer cancelled");
                        return;
                    }
                    frame = rx.next_frame() => match frame {
                        Some(frame) => sink.deliver(frame).await,
                        None => break,
                    }
                }
            }
            info!("message bus closed; cache consumer stopping");
            shutdown.request();
        }));
    }

    /// Joins the task after the bus has closed, without cancelling it.
    pub async fn join(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            handle.join().await;
        }
    }

    /// Cancels the task and joins it. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            handle.stop().await;
        }
    }
}

/// Pass-through reader of the control bus.
///
/// Logs every lifecycle frame; exits quietly on either cancellation or
/// closure.
pub struct ControlDrain {
    rx: Option<BusReceiver<ControlFrame>>,
    handle: Option<AdapterHandle>,
}

impl ControlDrain {
    /// Creates the drain over the control bus's receive side.
    pub fn new(rx: BusReceiver<ControlFrame>) -> Self {
        Self {
            rx: Some(rx),
            handle: None,
        }
    }

    /// Spawns the drain task. No-op when already started.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            warn!("control drain already started");
            return;
        }
        let mut rx = match self.rx.take() {
            Some(rx) => rx,
            None => return,
        };

        self.handle = Some(AdapterHandle::spawn(move |token| async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    frame = rx.next_frame() => match frame {
                        Some(frame) => {
                            info!(
                                source = %frame.source_adapter_id,
                                event = ?frame.event,
                                detail = ?frame.detail,
                                "control frame"
                            );
                        }
                        None => return,
                    }
                }
            }
        }));
    }

    /// Joins the task after the bus has closed, without cancelling it.
    pub async fn join(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            handle.join().await;
        }
    }

    /// Cancels the task and joins it. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            handle.stop().await;
        }
    }
}
