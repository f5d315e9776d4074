//! Runtime core: wiring, consumption, and coordinated shutdown.
//!
//! This module contains the process-level pieces that sit around the
//! adapters:
//! - [`gateway`]: builds the buses, starts every component, and runs the
//!   stop sequence when the root token fires;
//! - [`consumer`]: the single readers of the message and control buses;
//! - [`shutdown`]: the termination coordinator and the one shutdown
//!   broadcast primitive every component observes.

mod consumer;
mod gateway;
mod shutdown;

pub use consumer::{CacheConsumer, ControlDrain, FrameSink, LogSink};
pub use gateway::Gateway;
pub use shutdown::{shutdown_channel, ShutdownRequester, TerminationCoordinator};
