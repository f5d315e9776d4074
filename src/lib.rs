//! # framegate
//!
//! **framegate** is a protocol-adapter gateway: independent data-source
//! adapters (a polled PLC tag reader, one or more message-broker clients)
//! run as supervised background tasks, producing typed frames onto a shared
//! internal bus, with one coordinated shutdown for the whole process.
//!
//! The wire protocols themselves are out of scope: adapters talk to opaque
//! drivers through the minimal capability traits ([`PlcDriver`], [`BrokerDriver`]).
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌───────────────┐   ┌───────────────┐   ┌───────────────┐
//!  │  PlcAdapter   │   │ BrokerAdapter │   │ BrokerAdapter │
//!  │ (polled read) │   │ (conn.-orient)│   │ (conn.-orient)│
//!  └──────┬────────┘   └──────┬────────┘   └──────┬────────┘
//!         │ control + message │                   │
//!         ▼ frames            ▼                   ▼
//!  ┌───────────────────────────────────────────────────────────┐
//!  │  control bus (unbounded MPSC)  │  message bus (unbounded) │
//!  └──────────────┬─────────────────┴──────────────┬───────────┘
//!                 ▼                                ▼
//!         ┌──────────────┐                 ┌───────────────┐
//!         │ ControlDrain │                 │ CacheConsumer │──► FrameSink
//!         └──────────────┘                 └───────────────┘
//!
//!  shutdown requests (any component) ──► TerminationCoordinator
//!                                              │ fires once
//!                                              ▼
//!                                     root CancellationToken
//!                                              │ observed by
//!                                              ▼
//!                        Gateway stop sequence (cancel + join each task)
//! ```
//!
//! ### Adapter lifecycle
//! ```text
//! start() ──► spawn task
//!   ├─► STARTING
//!   ├─► polled:  create tag pool ─► sweep/sleep loop
//!   │            (backoff interval after a timeout, per-tag disable on error)
//!   ├─► broker:  CONNECTING ─► CONNECTED ─► event loop
//!   │            (DISCONNECTED ─► wait ─► one reconnect, per notification)
//!   ├─► [ERROR detail]   (unrecovered failure only)
//!   ├─► STOPPING         (always last; never a frame after it)
//!   └─► request process shutdown (first task to exit wins)
//!
//! stop() ──► cancel the task's token, join the task (idempotent)
//! ```
//!
//! ## Features
//! | Area            | Description                                             | Key types / traits                          |
//! |-----------------|---------------------------------------------------------|---------------------------------------------|
//! | **Frames**      | Immutable timestamped control/message events.           | [`ControlFrame`], [`MessageFrame`]          |
//! | **Bus**         | Unbounded multi-producer / single-consumer delivery.    | [`FrameBus`], [`BusSender`], [`BusReceiver`]|
//! | **Adapters**    | Supervised source bridges with retry/backoff policies.  | [`PlcAdapter`], [`BrokerAdapter`]           |
//! | **Drivers**     | Capability traits for the opaque protocol libraries.    | [`PlcDriver`], [`BrokerDriver`]             |
//! | **Consumption** | Single readers of each bus.                             | [`CacheConsumer`], [`FrameSink`]            |
//! | **Shutdown**    | One coordinator, one broadcast primitive.               | [`TerminationCoordinator`], [`ShutdownRequester`] |
//! | **Wiring**      | Process assembly and the stop sequence.                 | [`Gateway`], [`GatewayConfig`]              |
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use framegate::{Gateway, GatewayConfig, LogSink};
//! # use framegate::{PlcDriver, BrokerDriver};
//! # fn drivers() -> (Arc<dyn PlcDriver>, Arc<dyn BrokerDriver>) { unimplemented!() }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let cfg = GatewayConfig {
//!         terminate_after: Duration::from_secs(30),
//!         ..Default::default()
//!     };
//!     let (plc, broker) = drivers(); // real protocol drivers live outside this crate
//!     let gateway = Gateway::new(cfg, plc, broker, Arc::new(LogSink));
//!     gateway.run().await;
//! }
//! ```

mod adapters;
mod config;
mod drivers;
mod error;
mod frames;
mod runtime;

// ---- Public re-exports ----

pub use adapters::{AdapterHandle, BrokerAdapter, PlcAdapter};
pub use config::{
    BrokerAdapterConfig, GatewayConfig, MapperKind, PlcAdapterConfig, TagConfig, TopicConfig,
};
pub use drivers::{BrokerDriver, BrokerLink, BrokerSession, PlcDriver, TagHandle, TransportEvent};
pub use error::{AdapterError, ConfigError, DriverError};
pub use frames::{
    BusReceiver, BusSender, ControlEvent, ControlFrame, FrameBus, MessageFrame, MessagePayload,
    TagValue,
};
pub use runtime::{
    shutdown_channel, CacheConsumer, ControlDrain, FrameSink, Gateway, LogSink,
    ShutdownRequester, TerminationCoordinator,
};
