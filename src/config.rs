//! # Gateway and per-adapter configuration.
//!
//! Every adapter receives its own immutable configuration value at
//! construction time — there is no global options registry resolved by name
//! at runtime. [`GatewayConfig`] is the top-level bundle the runtime is built
//! from.
//!
//! ## Sentinel values
//! - `GatewayConfig::terminate_after = 0s` → timer disabled; the coordinator
//!   runs in signal-driven mode instead.
//!
//! ## Mapper registry
//! [`MapperKind`] is the closed set of tag value mappers the polled adapter
//! knows how to instantiate. Kinds are resolved while configuration is
//! loaded; an unknown name is a [`ConfigError::UnknownMapper`], not a
//! runtime lookup failure.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Closed registry of tag value mappers for the polled adapter.
///
/// One variant per payload shape a PLC tag read can produce; drivers return
/// the matching [`TagValue`](crate::frames::TagValue) variant. Parsed from
/// configuration via [`FromStr`], with an explicit error for unknown kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapperKind {
    /// Single-bit / boolean tag.
    Bool,
    /// 16-bit signed integer tag.
    Int16,
    /// 32-bit signed integer tag.
    Int32,
    /// 32-bit floating point tag.
    Float32,
    /// String tag.
    Text,
}

impl MapperKind {
    /// Resolves a mapper name from configuration.
    ///
    /// Accepts the snake_case names used in config files. Returns
    /// [`ConfigError::UnknownMapper`] for anything outside the registry,
    /// carrying the tag name for diagnostics.
    pub fn resolve(kind: &str, tag: &str) -> Result<Self, ConfigError> {
        kind.parse().map_err(|_| ConfigError::UnknownMapper {
            kind: kind.to_string(),
            tag: tag.to_string(),
        })
    }
}

impl FromStr for MapperKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool" => Ok(MapperKind::Bool),
            "int16" => Ok(MapperKind::Int16),
            "int32" => Ok(MapperKind::Int32),
            "float32" => Ok(MapperKind::Float32),
            "text" => Ok(MapperKind::Text),
            _ => Err(()),
        }
    }
}

/// One tag entry in the polled adapter's read pool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TagConfig {
    /// Whether the tag participates in the read sweep.
    ///
    /// Flipped to `false` at runtime when a non-timeout read error occurs and
    /// [`PlcAdapterConfig::remove_tag_on_error`] is set; the tag then stays
    /// out of the pool for the rest of the adapter's lifetime.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Which mapper instantiates the protocol handle for this tag.
    pub mapper: MapperKind,
    /// Protocol-level tag name (e.g. `B3:0/2`).
    pub name: String,
}

impl TagConfig {
    /// Creates an enabled tag entry.
    pub fn new(mapper: MapperKind, name: impl Into<String>) -> Self {
        Self {
            enabled: true,
            mapper,
            name: name.into(),
        }
    }
}

/// Configuration for one polled-read (PLC) adapter instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlcAdapterConfig {
    /// Instance name; becomes the `source_adapter_id` on every frame.
    pub name: String,
    /// Disabled adapters still run their task skeleton (STARTING/STOPPING)
    /// but create no handles and read nothing.
    pub enabled: bool,
    /// Gateway address of the PLC.
    pub gateway: String,
    /// Optional routing path to the controller.
    #[serde(default)]
    pub path: Option<String>,
    /// Per-read timeout handed to the driver.
    pub timeout: Duration,
    /// Normal sleep between read sweeps.
    pub read_interval: Duration,
    /// Sleep between sweeps while the backoff flag is set.
    pub backoff_on_timeout: Duration,
    /// When true, a non-timeout read error permanently disables that tag.
    #[serde(default)]
    pub remove_tag_on_error: bool,
    /// The read pool.
    #[serde(default)]
    pub tags: Vec<TagConfig>,
}

/// One subscription entry for a connection-oriented adapter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Whether this filter is subscribed after a successful connect.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Topic filter (e.g. `sharc/+/evt/#`).
    pub topic: String,
}

impl TopicConfig {
    /// Creates an enabled subscription entry.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            enabled: true,
            topic: topic.into(),
        }
    }
}

/// Configuration for one connection-oriented (broker) adapter instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BrokerAdapterConfig {
    /// Instance name; becomes the `source_adapter_id` on every frame.
    pub name: String,
    /// Disabled adapters still run their task skeleton but never connect.
    pub enabled: bool,
    /// Broker host.
    pub broker_address: String,
    /// Broker port.
    pub broker_port: u16,
    /// Whether the transport uses TLS.
    #[serde(default)]
    pub use_tls: bool,
    /// Credentials; empty strings mean anonymous.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Client identifier presented to the broker.
    pub client_id: String,
    /// Wait between a disconnect notification and the reconnect attempt.
    pub reconnect_interval: Duration,
    /// Subscriptions issued after every successful connect.
    #[serde(default)]
    pub subscription_topics: Vec<TopicConfig>,
}

/// Top-level configuration the gateway runtime is built from.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Polled-read adapter instances.
    #[serde(default)]
    pub plc_adapters: Vec<PlcAdapterConfig>,
    /// Connection-oriented adapter instances.
    #[serde(default)]
    pub broker_adapters: Vec<BrokerAdapterConfig>,
    /// Fixed-delay termination timer; `0` disables the timer and selects
    /// signal-driven mode.
    #[serde(default)]
    pub terminate_after: Duration,
}

impl GatewayConfig {
    /// Returns the termination timer as an `Option`.
    ///
    /// - `None` → signal-driven mode (block on the termination channel)
    /// - `Some(d)` → fire unconditionally after `d`
    #[inline]
    pub fn terminate_after(&self) -> Option<Duration> {
        if self.terminate_after == Duration::ZERO {
            None
        } else {
            Some(self.terminate_after)
        }
    }
}

fn default_enabled() -> bool {
    true
}
