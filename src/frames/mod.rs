//! Frames: the event data model and the bus that delivers it.
//!
//! This module groups the two frame kinds adapters produce and the
//! single-consumer channel they travel on.
//!
//! ## Contents
//! - [`ControlFrame`], [`ControlEvent`] — lifecycle/status events
//! - [`MessageFrame`], [`MessagePayload`], [`TagValue`] — data events
//! - [`FrameBus`], [`BusSender`], [`BusReceiver`] — unbounded MPSC delivery
//!
//! ## Quick reference
//! - **Producers**: every adapter task (control + message), one sender clone
//!   per producer.
//! - **Consumers**: exactly one per bus — the device-cache consumer drains
//!   the message bus, the control drain logs the control bus.
//!
//! Two independent bus instances exist per gateway (control, message); they
//! share no ordering relationship.

mod bus;
mod control;
mod message;

pub use bus::{BusReceiver, BusSender, FrameBus};
pub use control::{ControlEvent, ControlFrame};
pub use message::{MessageFrame, MessagePayload, TagValue};

/// Milliseconds since the Unix epoch, the creation timestamp on every frame.
pub(crate) fn unix_millis_now() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().min(i64::MAX as u128) as i64)
        .unwrap_or(0)
}
