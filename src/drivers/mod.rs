//! Capability traits for the opaque protocol drivers.
//!
//! The gateway never implements a wire protocol. Each adapter talks to its
//! external driver through the minimal surface defined here, and treats
//! every call as a black box that may suspend the task but never blocks the
//! worker pool.
//!
//! ## Contents
//! - [`PlcDriver`], [`TagHandle`] — polled tag reads
//! - [`BrokerDriver`], [`BrokerSession`], [`BrokerLink`], [`TransportEvent`]
//!   — connection-oriented transports

mod broker;
mod plc;

pub use broker::{BrokerDriver, BrokerLink, BrokerSession, TransportEvent};
pub use plc::{PlcDriver, TagHandle};
