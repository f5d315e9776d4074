//! # Gateway: wires the components and drives the stop sequence.
//!
//! The [`Gateway`] owns the configuration and the driver/sink collaborators.
//! [`Gateway::run`] builds the two buses, the root cancellation token, and
//! the termination-signal channel, starts every component, and then waits
//! for the root token.
//!
//! ## Wiring
//! ```text
//!   PLC adapters    ──┬── control bus ──► ControlDrain
//!   broker adapters ──┘
//!   PLC adapters    ──┬── message bus ──► CacheConsumer ──► FrameSink
//!   broker adapters ──┘
//!
//!   everyone ── ShutdownRequester ──► TerminationCoordinator ──► root token
//! ```
//!
//! ## Stop sequence
//! First exit wins: an adapter task ending on its own requests shutdown, as
//! does the consumer when its bus closes, as does the coordinator's timer.
//! Once the root token fires the gateway:
//! 1. stops every adapter (cancel + join, idempotent),
//! 2. drops the adapter structs so their bus senders go away and the buses
//!    close,
//! 3. joins the consumer and the drain, which finish draining on their own,
//! 4. stops the coordinator.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::adapters::{BrokerAdapter, PlcAdapter};
use crate::config::GatewayConfig;
use crate::drivers::{BrokerDriver, PlcDriver};
use crate::frames::FrameBus;
use crate::runtime::{
    shutdown_channel, CacheConsumer, ControlDrain, FrameSink, TerminationCoordinator,
};

/// The assembled process: adapters, buses, consumer, coordinator.
pub struct Gateway {
    cfg: GatewayConfig,
    plc_driver: Arc<dyn PlcDriver>,
    broker_driver: Arc<dyn BrokerDriver>,
    sink: Arc<dyn FrameSink>,
}

impl Gateway {
    /// Creates the gateway with its collaborators.
    pub fn new(
        cfg: GatewayConfig,
        plc_driver: Arc<dyn PlcDriver>,
        broker_driver: Arc<dyn BrokerDriver>,
        sink: Arc<dyn FrameSink>,
    ) -> Self {
        Self {
            cfg,
            plc_driver,
            broker_driver,
            sink,
        }
    }

    /// Runs the gateway until a coordinated shutdown completes.
    ///
    /// Returns once every component has been joined; no task outlives this
    /// call.
    pub async fn run(self) {
        let (control_tx, control_rx) = FrameBus::channel();
        let (message_tx, message_rx) = FrameBus::channel();
        let (requester, signal_rx) = shutdown_channel();
        let root = CancellationToken::new();

        let mut plc_adapters: Vec<PlcAdapter> = self
            .cfg
            .plc_adapters
            .iter()
            .map(|cfg| {
                PlcAdapter::new(
                    cfg.clone(),
                    Arc::clone(&self.plc_driver),
                    control_tx.clone(),
                    message_tx.clone(),
                    requester.clone(),
                )
            })
            .collect();
        let mut broker_adapters: Vec<BrokerAdapter> = self
            .cfg
            .broker_adapters
            .iter()
            .map(|cfg| {
                BrokerAdapter::new(
                    cfg.clone(),
                    Arc::clone(&self.broker_driver),
                    control_tx.clone(),
                    message_tx.clone(),
                    requester.clone(),
                )
            })
            .collect();

        let mut consumer =
            CacheConsumer::new(message_rx, Arc::clone(&self.sink), requester.clone());
        let mut drain = ControlDrain::new(control_rx);
        let mut coordinator =
            TerminationCoordinator::new(self.cfg.terminate_after(), signal_rx, root.clone());

        // The components hold their own clones from here on.
        drop(control_tx);
        drop(message_tx);
        drop(requester);

        for adapter in &mut plc_adapters {
            adapter.start();
        }
        for adapter in &mut broker_adapters {
            adapter.start();
        }
        consumer.start();
        drain.start();
        coordinator.start();

        root.cancelled().await;
        info!("shutdown triggered; stopping adapters");

        for adapter in &mut plc_adapters {
            adapter.stop().await;
        }
        for adapter in &mut broker_adapters {
            adapter.stop().await;
        }
        // Dropping the adapter structs releases the last bus senders; the
        // buses close and the readers drain to end-of-stream.
        drop(plc_adapters);
        drop(broker_adapters);

        consumer.join().await;
        drain.join().await;
        coordinator.stop().await;
        info!("gateway stopped");
    }
}
