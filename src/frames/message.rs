//! # Message frames: data events.
//!
//! A [`MessageFrame`] carries one data item from an adapter to the message
//! bus: a tag reading from the polled adapter, or a raw broker event from a
//! connection-oriented adapter. The payload is a closed tagged union — one
//! variant per known shape, nothing dynamic.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::MapperKind;
use crate::frames::unix_millis_now;

/// A typed tag value, one variant per [`MapperKind`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    /// Value of a [`MapperKind::Bool`] tag.
    Bool(bool),
    /// Value of a [`MapperKind::Int16`] tag.
    Int16(i16),
    /// Value of a [`MapperKind::Int32`] tag.
    Int32(i32),
    /// Value of a [`MapperKind::Float32`] tag.
    Float32(f32),
    /// Value of a [`MapperKind::Text`] tag.
    Text(String),
}

impl TagValue {
    /// The mapper kind this value belongs to.
    pub fn kind(&self) -> MapperKind {
        match self {
            TagValue::Bool(_) => MapperKind::Bool,
            TagValue::Int16(_) => MapperKind::Int16,
            TagValue::Int32(_) => MapperKind::Int32,
            TagValue::Float32(_) => MapperKind::Float32,
            TagValue::Text(_) => MapperKind::Text,
        }
    }
}

/// Closed union of message payload shapes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MessagePayload {
    /// One successful tag read from a polled adapter.
    #[serde(rename_all = "camelCase")]
    TagReading {
        /// Protocol-level tag name.
        tag: String,
        /// The value read.
        value: TagValue,
    },
    /// One inbound item from a connection-oriented adapter, verbatim.
    #[serde(rename_all = "camelCase")]
    BrokerEvent {
        /// Source topic/address.
        topic: String,
        /// Raw payload bytes, untransformed.
        payload: Vec<u8>,
    },
}

/// Immutable data event record.
///
/// Same lifecycle rules as [`ControlFrame`](crate::frames::ControlFrame):
/// created once, owned by the bus once written, consumed by the single
/// message-bus reader.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageFrame {
    /// Creation time, milliseconds since the Unix epoch.
    pub timestamp_created_ms: i64,
    /// Name of the adapter instance that produced the frame.
    pub source_adapter_id: Arc<str>,
    /// The data item.
    pub payload: MessagePayload,
}

impl MessageFrame {
    /// Creates a frame timestamped now.
    pub fn new(source: impl Into<Arc<str>>, payload: MessagePayload) -> Self {
        Self {
            timestamp_created_ms: unix_millis_now(),
            source_adapter_id: source.into(),
            payload,
        }
    }

    /// Shorthand for a tag-reading frame.
    pub fn tag_reading(
        source: impl Into<Arc<str>>,
        tag: impl Into<String>,
        value: TagValue,
    ) -> Self {
        Self::new(
            source,
            MessagePayload::TagReading {
                tag: tag.into(),
                value,
            },
        )
    }

    /// Shorthand for a broker-event frame.
    pub fn broker_event(
        source: impl Into<Arc<str>>,
        topic: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self::new(
            source,
            MessagePayload::BrokerEvent {
                topic: topic.into(),
                payload,
            },
        )
    }
}
