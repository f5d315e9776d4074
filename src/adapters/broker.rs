//! # Connection-oriented adapter (broker-style).
//!
//! Bridges one message-broker connection into the buses. The transport is
//! opaque; only connect, subscribe, the event stream, and disconnect matter.
//!
//! ## State machine
//! ```text
//! Starting ──► Connecting ──► Connected ──► (disconnect notification)
//!                  ▲                              │
//!                  └── wait reconnect_interval ◄──┘
//!
//! on cancel: Disconnecting ──► close transport ──► Disconnected ──► Stopping
//! ```
//!
//! ## Rules
//! - A failed connect attempt is logged; the adapter stays disconnected and
//!   idles until cancellation — retry is driven *only* by disconnect
//!   notifications.
//! - Every disconnect notification is followed, after `reconnect_interval`,
//!   by exactly one connect attempt, for as long as the adapter runs.
//! - Inbound items become message frames verbatim, no transformation.
//! - On shutdown the event stream is dropped *before* the transport closes,
//!   so the close's own disconnect notification can never re-enter the
//!   reconnect path.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::adapters::{emit_exit_frames, run_isolated, AdapterHandle, FrameEmitter};
use crate::config::BrokerAdapterConfig;
use crate::drivers::{BrokerDriver, BrokerLink, TransportEvent};
use crate::error::{AdapterError, DriverError};
use crate::frames::{BusSender, ControlEvent, ControlFrame, MessageFrame, MessagePayload};
use crate::runtime::ShutdownRequester;

/// Connection-oriented adapter instance.
///
/// Owns one background task between [`start`](Self::start) and a completed
/// [`stop`](Self::stop). Disabled instances run the task skeleton but never
/// connect.
pub struct BrokerAdapter {
    cfg: Arc<BrokerAdapterConfig>,
    driver: Arc<dyn BrokerDriver>,
    control_tx: BusSender<ControlFrame>,
    message_tx: BusSender<MessageFrame>,
    shutdown: ShutdownRequester,
    handle: Option<AdapterHandle>,
}

impl BrokerAdapter {
    /// Creates the adapter with its own configuration snapshot.
    pub fn new(
        cfg: BrokerAdapterConfig,
        driver: Arc<dyn BrokerDriver>,
        control_tx: BusSender<ControlFrame>,
        message_tx: BusSender<MessageFrame>,
        shutdown: ShutdownRequester,
    ) -> Self {
        Self {
            cfg: Arc::new(cfg),
            driver,
            control_tx,
            message_tx,
            shutdown,
            handle: None,
        }
    }

    /// The instance name frames are stamped with.
    pub fn name(&self) -> &str {
        &self.cfg.name
    }

    /// Spawns the background task. No-op when already started.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            warn!(adapter = %self.cfg.name, "adapter already started");
            return;
        }
        let cfg = Arc::clone(&self.cfg);
        let driver = Arc::clone(&self.driver);
        let emitter = FrameEmitter::new(
            Arc::from(self.cfg.name.as_str()),
            self.control_tx.clone(),
            self.message_tx.clone(),
        );
        let shutdown = self.shutdown.clone();

        self.handle = Some(AdapterHandle::spawn(move |token| async move {
            run_task(cfg, driver, emitter, shutdown, token).await;
        }));
    }

    /// Cancels the task's token and joins the task. Idempotent.
    pub async fn stop(&mut self) {
        info!(adapter = %self.cfg.name, "stop");
        if let Some(handle) = self.handle.as_mut() {
            handle.stop().await;
        }
    }
}

/// Task body: frames in, frames out, nothing escapes.
async fn run_task(
    cfg: Arc<BrokerAdapterConfig>,
    driver: Arc<dyn BrokerDriver>,
    emitter: FrameEmitter,
    shutdown: ShutdownRequester,
    token: CancellationToken,
) {
    emitter.control(ControlEvent::Starting);

    match run_isolated(connection_loop(&cfg, driver.as_ref(), &emitter, &token)).await {
        Ok(link) => {
            disconnect_cleanly(link, &emitter).await;
            emit_exit_frames(&emitter, Ok(()));
        }
        Err(e) => emit_exit_frames(&emitter, Err(e)),
    }

    shutdown.request();
}

/// Runs until cancelled; returns whatever connection is live at that point.
///
/// Without a live connection the task idles on the token — there is nothing
/// to wait for besides cancellation, since retry is disconnect-driven.
async fn connection_loop(
    cfg: &BrokerAdapterConfig,
    driver: &dyn BrokerDriver,
    emitter: &FrameEmitter,
    token: &CancellationToken,
) -> Result<Option<BrokerLink>, AdapterError> {
    let mut link = if cfg.enabled {
        try_connect(cfg, driver, emitter, token).await?
    } else {
        None
    };

    loop {
        match link.as_mut() {
            None => {
                token.cancelled().await;
                return Ok(None);
            }
            Some(live) => {
                tokio::select! {
                    _ = token.cancelled() => return Ok(link),
                    event = live.events.recv() => match event {
                        Some(TransportEvent::Message { topic, payload }) => {
                            emitter.message(MessagePayload::BrokerEvent { topic, payload });
                        }
                        Some(TransportEvent::Disconnected) | None => {
                            emitter.control(ControlEvent::Disconnected);
                            tokio::select! {
                                _ = tokio::time::sleep(cfg.reconnect_interval) => {}
                                _ = token.cancelled() => return Ok(None),
                            }
                            link = try_connect(cfg, driver, emitter, token).await?;
                        }
                    }
                }
            }
        }
    }
}

/// One connect attempt: CONNECTING, connect, subscribe enabled topics,
/// CONNECTED.
///
/// A failure is logged and leaves the adapter disconnected; there is no
/// immediate retry from this path.
async fn try_connect(
    cfg: &BrokerAdapterConfig,
    driver: &dyn BrokerDriver,
    emitter: &FrameEmitter,
    token: &CancellationToken,
) -> Result<Option<BrokerLink>, AdapterError> {
    emitter.control(ControlEvent::Connecting);

    let mut link = match driver.connect(cfg, token).await {
        Ok(link) => link,
        Err(DriverError::Canceled) => return Err(AdapterError::Canceled),
        Err(e) => {
            warn!(adapter = %cfg.name, error = %e, "failed to connect to broker");
            return Ok(None);
        }
    };

    let topics: Vec<&str> = cfg
        .subscription_topics
        .iter()
        .filter(|t| t.enabled)
        .map(|t| t.topic.as_str())
        .collect();
    match link.session.subscribe(&topics).await {
        Ok(()) => {
            emitter.control(ControlEvent::Connected);
            Ok(Some(link))
        }
        Err(DriverError::Canceled) => Err(AdapterError::Canceled),
        Err(e) => {
            warn!(adapter = %cfg.name, error = %e, "failed to subscribe after connect");
            Ok(None)
        }
    }
}

/// Shutdown path: DISCONNECTING, drop the event stream, close the
/// transport, DISCONNECTED.
///
/// The stream is dropped before the close so the disconnect notification
/// the close raises is never observed. The final DISCONNECTED is emitted
/// whether or not a connection was live.
async fn disconnect_cleanly(link: Option<BrokerLink>, emitter: &FrameEmitter) {
    if let Some(mut live) = link {
        emitter.control(ControlEvent::Disconnecting);
        drop(live.events);
        live.session.disconnect().await;
    }
    emitter.control(ControlEvent::Disconnected);
}
