//! # Termination coordinator and the shutdown-broadcast primitive.
//!
//! Exactly one [`TerminationCoordinator`] exists per gateway. It is the only
//! component that fires the root [`CancellationToken`]; every other
//! component *requests* shutdown through a [`ShutdownRequester`] instead of
//! mutating shared state.
//!
//! ## Architecture
//! ```text
//!   PLC adapter    ──┐
//!   broker adapter ──┼── request() ──► signal channel ──► Coordinator ──► root.cancel()
//!   consumer       ──┘                                        ▲
//!                                     optional fixed timer ───┘
//! ```
//!
//! ## Modes
//! - **Fixed-delay** (`Some(duration)`): fire unconditionally once the timer
//!   elapses. Requests arriving earlier still fire immediately.
//! - **Signal-driven** (`None`): block on the channel and fire on the first
//!   request — or on the channel closing (every requester dropped). Closing,
//!   not a particular value, is already a valid trigger.
//!
//! Firing is idempotent; the first trigger wins and the rest are no-ops.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::adapters::AdapterHandle;

/// Creates the termination-signal channel.
///
/// Clone the requester once per component; the receiver belongs to the
/// coordinator.
pub fn shutdown_channel() -> (ShutdownRequester, mpsc::UnboundedReceiver<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ShutdownRequester { tx }, rx)
}

/// A component's handle for requesting process shutdown.
///
/// Requesting never suspends and never fails; once the coordinator has fired
/// (or stopped), further requests are quietly dropped.
#[derive(Clone, Debug)]
pub struct ShutdownRequester {
    tx: mpsc::UnboundedSender<()>,
}

impl ShutdownRequester {
    /// Asks the coordinator to begin process-wide shutdown.
    pub fn request(&self) {
        let _ = self.tx.send(());
    }
}

/// Decides when the whole process stops.
///
/// Owns the signal channel's receive side and the root token. Started and
/// stopped like any other supervised component; its own task exits as soon
/// as it has fired.
pub struct TerminationCoordinator {
    delay: Option<Duration>,
    signal_rx: Option<mpsc::UnboundedReceiver<()>>,
    root: CancellationToken,
    handle: Option<AdapterHandle>,
}

impl TerminationCoordinator {
    /// Creates the coordinator.
    ///
    /// `delay = None` selects signal-driven mode; `Some(d)` arms the fixed
    /// timer as well.
    pub fn new(
        delay: Option<Duration>,
        signal_rx: mpsc::UnboundedReceiver<()>,
        root: CancellationToken,
    ) -> Self {
        Self {
            delay,
            signal_rx: Some(signal_rx),
            root,
            handle: None,
        }
    }

    /// Spawns the coordinator task. No-op when already started.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            warn!("termination coordinator already started");
            return;
        }
        let delay = self.delay;
        let mut rx = match self.signal_rx.take() {
            Some(rx) => rx,
            None => return,
        };
        let root = self.root.clone();

        self.handle = Some(AdapterHandle::spawn(move |token| async move {
            let fired = match delay {
                Some(d) => {
                    tokio::select! {
                        _ = tokio::time::sleep(d) => {
                            info!(after = ?d, "termination timer elapsed");
                            true
                        }
                        res = rx.recv() => signal_observed(res),
                        _ = token.cancelled() => false,
                    }
                }
                None => {
                    tokio::select! {
                        res = rx.recv() => signal_observed(res),
                        _ = token.cancelled() => false,
                    }
                }
            };
            if fired {
                root.cancel();
            }
        }));
    }

    /// Cancels the coordinator task and joins it. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            handle.stop().await;
        }
    }
}

/// Both a received request and a closed channel trigger shutdown.
fn signal_observed(res: Option<()>) -> bool {
    match res {
        Some(()) => info!("termination signal received"),
        None => info!("termination channel closed"),
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_fires_the_root_token() {
        let (requester, rx) = shutdown_channel();
        let root = CancellationToken::new();
        let mut coordinator = TerminationCoordinator::new(None, rx, root.clone());
        coordinator.start();

        requester.request();
        root.cancelled().await;
        coordinator.stop().await;
    }

    #[tokio::test]
    async fn closing_the_channel_fires_the_root_token() {
        let (requester, rx) = shutdown_channel();
        let root = CancellationToken::new();
        let mut coordinator = TerminationCoordinator::new(None, rx, root.clone());
        coordinator.start();

        drop(requester); // closing, not a value, is the signal
        root.cancelled().await;
        coordinator.stop().await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn fixed_delay_fires_unconditionally() {
        let (_requester, rx) = shutdown_channel();
        let root = CancellationToken::new();
        let mut coordinator =
            TerminationCoordinator::new(Some(Duration::from_secs(3)), rx, root.clone());
        coordinator.start();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!root.is_cancelled());

        root.cancelled().await; // auto-advancing clock reaches the timer
        coordinator.stop().await;
    }

    #[tokio::test]
    async fn an_early_request_beats_the_timer() {
        let (requester, rx) = shutdown_channel();
        let root = CancellationToken::new();
        let mut coordinator =
            TerminationCoordinator::new(Some(Duration::from_secs(3600)), rx, root.clone());
        coordinator.start();

        requester.request();
        root.cancelled().await;
        coordinator.stop().await;
    }

    #[tokio::test]
    async fn stopping_an_unfired_coordinator_leaves_the_root_alone() {
        let (_requester, rx) = shutdown_channel();
        let root = CancellationToken::new();
        let mut coordinator = TerminationCoordinator::new(None, rx, root.clone());
        coordinator.start();
        coordinator.stop().await;
        assert!(!root.is_cancelled());
    }
}
