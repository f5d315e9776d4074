//! # Broker driver capability: connect, subscribe, event stream, disconnect.
//!
//! A connection-oriented adapter obtains one [`BrokerLink`] per successful
//! connect. The link couples the session handle (subscribe/disconnect) with
//! the transport event stream; dropping the stream half is the adapter's way
//! of unregistering its interest before a clean disconnect — disconnect
//! notifications raised after that are never observed, so shutdown cannot
//! race into a reconnect.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::BrokerAdapterConfig;
use crate::error::DriverError;

/// Events the transport pushes to the adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// One inbound item; bytes are delivered verbatim.
    Message {
        /// Source topic/address.
        topic: String,
        /// Raw payload bytes.
        payload: Vec<u8>,
    },
    /// The transport connection dropped.
    Disconnected,
}

/// A live connection plus its event stream.
pub struct BrokerLink {
    /// Session handle for subscribe/disconnect calls.
    pub session: Box<dyn BrokerSession>,
    /// Transport events; closes when the connection is gone for good.
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Factory for broker connections.
#[async_trait]
pub trait BrokerDriver: Send + Sync + 'static {
    /// Opens a transport connection with the configured address/credentials.
    ///
    /// Suspends until the connect handshake resolves or the token is
    /// cancelled ([`DriverError::Canceled`]). A failed attempt is logged by
    /// the adapter, which then stays disconnected — retry is driven solely
    /// by disconnect notifications.
    async fn connect(
        &self,
        conn: &BrokerAdapterConfig,
        token: &CancellationToken,
    ) -> Result<BrokerLink, DriverError>;
}

/// One open broker connection.
#[async_trait]
pub trait BrokerSession: Send {
    /// Subscribes to the given topic filters.
    async fn subscribe(&mut self, topics: &[&str]) -> Result<(), DriverError>;

    /// Closes the transport.
    ///
    /// Called exactly once, on the shutdown path, after the adapter has
    /// dropped its event stream.
    async fn disconnect(&mut self);
}
