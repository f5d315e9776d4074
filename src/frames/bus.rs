//! # Frame bus: unbounded multi-producer / single-consumer delivery.
//!
//! [`FrameBus`] is a thin wrapper around [`tokio::sync::mpsc::unbounded_channel`]
//! that gives every adapter a cheap sender clone and the single consumer a
//! suspending receive call.
//!
//! ## Architecture
//! ```text
//! Producers (many):                      Consumer (one):
//!   PLC adapter    ──┐
//!   broker adapter ──┼──────► FrameBus ───────► next_frame() loop
//!   broker adapter ──┘   (unbounded mpsc)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never suspends; the channel is
//!   logically unbounded and only fails once the receiver is gone.
//! - **FIFO per producer**: one producer's frames are never reordered; no
//!   ordering promise across producers beyond first-observed, first-delivered.
//! - **Close to terminate**: dropping every sender closes the bus; the
//!   consumer keeps draining buffered frames and then gets end-of-stream.
//!   Closing is the *only* clean way a consumer loop ends.

use tokio::sync::mpsc;

/// Bus constructor; two instances exist per gateway (control, message).
pub struct FrameBus;

impl FrameBus {
    /// Creates a connected sender/receiver pair.
    ///
    /// Clone the sender once per producer; the receiver is the single
    /// consumer's exclusive handle.
    pub fn channel<T>() -> (BusSender<T>, BusReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (BusSender { tx }, BusReceiver { rx })
    }
}

/// Producer handle: clone one per writer.
#[derive(Debug)]
pub struct BusSender<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for BusSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> BusSender<T> {
    /// Publishes a frame.
    ///
    /// Never suspends. The frame is silently dropped if the consumer is
    /// already gone — by then the process is shutting down and the frame has
    /// nowhere to go.
    pub fn publish(&self, frame: T) {
        let _ = self.tx.send(frame);
    }

    /// True once the consumer side has been dropped or closed.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer handle: exactly one per bus.
#[derive(Debug)]
pub struct BusReceiver<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> BusReceiver<T> {
    /// Receives the next frame.
    ///
    /// Suspends until a frame is available. After the bus closes, keeps
    /// returning buffered frames until the queue is empty, then returns
    /// `None` (end-of-stream).
    pub async fn next_frame(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Non-suspending receive, for drain loops after close.
    pub fn try_next_frame(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}
