//! # Polled-read adapter (PLC-style).
//!
//! Sweeps a pool of protocol tag handles on an interval and emits one
//! message frame per successful read.
//!
//! ## State machine
//! ```text
//! Starting ──► create tag pool ──► read loop ──► destroy pool ──► Stopping
//!                                   │
//!                                   ├─ success       → clear backoff,
//!                                   │                  CONNECTED on first,
//!                                   │                  emit TagReading frame
//!                                   ├─ timeout       → set backoff,
//!                                   │                  abort this sweep
//!                                   └─ other error   → optionally disable
//!                                                      just that tag, go on
//! ```
//!
//! ## Rules
//! - The first timeout in a sweep **breaks out** of the remaining tags; the
//!   next sweep is delayed by `backoff_on_timeout` instead of
//!   `read_interval`, until a read succeeds again.
//! - A non-timeout read error never sets backoff; with
//!   `remove_tag_on_error` it flips that tag's `enabled` flag off for the
//!   rest of the adapter's lifetime.
//! - Cancellation exits the loop quietly; any unrecovered error emits
//!   `ERROR`, then `STOPPING` is always emitted, the pool is dropped, and
//!   process-wide shutdown is requested.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::adapters::{emit_exit_frames, run_isolated, AdapterHandle, FrameEmitter};
use crate::config::PlcAdapterConfig;
use crate::drivers::{PlcDriver, TagHandle};
use crate::error::{AdapterError, DriverError};
use crate::frames::{BusSender, ControlEvent, ControlFrame, MessageFrame, MessagePayload};
use crate::runtime::ShutdownRequester;

/// One entry of the read pool: a tag's runtime flag plus its protocol handle.
///
/// Exclusively owned by the adapter task; dropping the entry disposes the
/// handle.
struct PoolEntry {
    enabled: bool,
    name: String,
    handle: Box<dyn TagHandle>,
}

/// Polled-read adapter instance.
///
/// Owns one background task between [`start`](Self::start) and a completed
/// [`stop`](Self::stop). Disabled instances still run the task skeleton and
/// emit `STARTING`/`STOPPING`, but create no handles and read nothing.
pub struct PlcAdapter {
    cfg: Arc<PlcAdapterConfig>,
    driver: Arc<dyn PlcDriver>,
    control_tx: BusSender<ControlFrame>,
    message_tx: BusSender<MessageFrame>,
    shutdown: ShutdownRequester,
    handle: Option<AdapterHandle>,
}

impl PlcAdapter {
    /// Creates the adapter with its own configuration snapshot.
    pub fn new(
        cfg: PlcAdapterConfig,
        driver: Arc<dyn PlcDriver>,
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
    cfg: Arc<PlcAdapterConfig>,
    driver: Arc<dyn PlcDriver>,
    emitter: FrameEmitter,
    shutdown: ShutdownRequester,
    token: CancellationToken,
) {
    emitter.control(ControlEvent::Starting);

    let mut pool = if cfg.enabled {
        build_pool(&cfg, driver.as_ref())
    } else {
        Vec::new()
    };

    let outcome = run_isolated(read_loop(&cfg, &mut pool, &emitter, &token)).await;

    // Destroy all tag handles before reporting the stop.
    pool.clear();

    emit_exit_frames(&emitter, outcome);
    shutdown.request();
}

/// Creates one protocol handle per configured tag entry.
///
/// A per-tag creation failure is logged and skips that tag; it is not fatal
/// to the adapter.
fn build_pool(cfg: &PlcAdapterConfig, driver: &dyn PlcDriver) -> Vec<PoolEntry> {
    let mut pool = Vec::with_capacity(cfg.tags.len());
    for tag in &cfg.tags {
        match driver.create_handle(tag, cfg) {
            Ok(handle) => pool.push(PoolEntry {
                enabled: tag.enabled,
                name: tag.name.clone(),
                handle,
            }),
            Err(e) => {
                warn!(adapter = %cfg.name, tag = %tag.name, error = %e,
                    "failed to create tag handle; tag skipped");
            }
        }
    }
    pool
}

/// Ticks until cancelled: sweep, then sleep the normal or backoff interval.
async fn read_loop(
    cfg: &PlcAdapterConfig,
    pool: &mut Vec<PoolEntry>,
    emitter: &FrameEmitter,
    token: &CancellationToken,
) -> Result<(), AdapterError> {
    let mut connected = false;
    let mut backoff = false;

    while !token.is_cancelled() {
        if cfg.enabled {
            sweep(cfg, pool, emitter, token, &mut connected, &mut backoff).await?;
        }

        let delay = if backoff {
            cfg.backoff_on_timeout
        } else {
            cfg.read_interval
        };
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = token.cancelled() => break,
        }
    }

    Err(AdapterError::Canceled)
}

/// Reads every enabled pool entry once.
///
/// Break-on-timeout is the contract: the first timeout aborts the remainder
/// of this sweep and arms the backoff interval.
async fn sweep(
    cfg: &PlcAdapterConfig,
    pool: &mut [PoolEntry],
    emitter: &FrameEmitter,
    token: &CancellationToken,
    connected: &mut bool,
    backoff: &mut bool,
) -> Result<(), AdapterError> {
    for entry in pool.iter_mut().filter(|e| e.enabled) {
        match entry.handle.read(token).await {
            Ok(value) => {
                *backoff = false;
                if !*connected {
                    *connected = true;
                    emitter.control(ControlEvent::Connected);
                }
                emitter.message(MessagePayload::TagReading {
                    tag: entry.name.clone(),
                    value,
                });
            }
            Err(DriverError::Canceled) => return Err(AdapterError::Canceled),
            Err(e) if e.is_timeout() => {
                warn!(adapter = %cfg.name, tag = %entry.name, error = %e,
                    "tag read timed out; breaking out of sweep");
                *backoff = true;
                break;
            }
            Err(e) => {
                warn!(adapter = %cfg.name, tag = %entry.name, error = %e,
                    "failed to read tag");
                if cfg.remove_tag_on_error {
                    info!(adapter = %cfg.name, tag = %entry.name,
                        "tag removed from read pool");
                    entry.enabled = false;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::config::{MapperKind, TagConfig};
    use crate::frames::{BusReceiver, FrameBus, TagValue};
    use crate::runtime::shutdown_channel;

    /// Scripted driver: per tag, a queue of read outcomes; the last script
    /// entry repeats forever.
    #[derive(Default)]
    struct ScriptedDriver {
        scripts: Mutex<HashMap<String, VecDeque<Script>>>,
        fail_create: Mutex<Vec<String>>,
    }

    #[derive(Clone)]
    enum Script {
        Value(TagValue),
        Timeout,
        Error(&'static str),
    }

    impl ScriptedDriver {
        fn script(&self, tag: &str, steps: Vec<Script>) {
            self.scripts
                .lock()
                .unwrap()
                .insert(tag.to_string(), steps.into());
        }

        fn fail_create_for(&self, tag: &str) {
            self.fail_create.lock().unwrap().push(tag.to_string());
        }
    }

    struct ScriptedHandle {
        tag: String,
        steps: VecDeque<Script>,
    }

    impl PlcDriver for ScriptedDriver {
        fn create_handle(
            &self,
            tag: &TagConfig,
            _conn: &PlcAdapterConfig,
        ) -> Result<Box<dyn TagHandle>, DriverError> {
            if self.fail_create.lock().unwrap().contains(&tag.name) {
                return Err(DriverError::Failed {
                    error: "no such tag".into(),
                });
            }
            let steps = self
                .scripts
                .lock()
                .unwrap()
                .get(&tag.name)
                .cloned()
                .unwrap_or_default();
            Ok(Box::new(ScriptedHandle {
                tag: tag.name.clone(),
                steps,
            }))
        }
    }

    #[async_trait]
    impl TagHandle for ScriptedHandle {
        async fn read(&mut self, _token: &CancellationToken) -> Result<TagValue, DriverError> {
            let step = if self.steps.len() > 1 {
                self.steps.pop_front()
            } else {
                self.steps.front().cloned()
            };
            match step {
                Some(Script::Value(v)) => Ok(v),
                Some(Script::Timeout) => Err(DriverError::Timeout {
                    timeout: Duration::from_millis(5000),
                }),
                Some(Script::Error(msg)) => Err(DriverError::Failed { error: msg.into() }),
                None => panic!("unscripted read for tag {}", self.tag),
            }
        }
    }

    fn config(tags: Vec<TagConfig>) -> PlcAdapterConfig {
        PlcAdapterConfig {
            name: "bunker-micro".into(),
            enabled: true,
            gateway: "192.168.111.20".into(),
            path: None,
            timeout: Duration::from_millis(5000),
            read_interval: Duration::from_millis(100),
            backoff_on_timeout: Duration::from_millis(2000),
            remove_tag_on_error: false,
            tags,
        }
    }

    struct Harness {
        adapter: PlcAdapter,
        control: BusReceiver<ControlFrame>,
        message: BusReceiver<MessageFrame>,
    }

    fn harness(cfg: PlcAdapterConfig, driver: Arc<ScriptedDriver>) -> Harness {
        let (ctl_tx, control) = FrameBus::channel();
        let (msg_tx, message) = FrameBus::channel();
        let (requester, _rx) = shutdown_channel();
        let adapter = PlcAdapter::new(cfg, driver, ctl_tx, msg_tx, requester);
        Harness {
            adapter,
            control,
            message,
        }
    }

    async fn collect_events(rx: &mut BusReceiver<ControlFrame>) -> Vec<ControlEvent> {
        let mut events = Vec::new();
        while let Some(frame) = rx.next_frame().await {
            events.push(frame.event);
        }
        events
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn first_success_emits_connected_then_readings() {
        let driver = Arc::new(ScriptedDriver::default());
        driver.script("B3:0/2", vec![Script::Value(TagValue::Bool(true))]);

        let mut h = harness(
            config(vec![TagConfig::new(MapperKind::Bool, "B3:0/2")]),
            driver,
        );
        h.adapter.start();

        assert_eq!(
            h.control.next_frame().await.unwrap().event,
            ControlEvent::Starting
        );
        assert_eq!(
            h.control.next_frame().await.unwrap().event,
            ControlEvent::Connected
        );
        let frame = h.message.next_frame().await.unwrap();
        assert_eq!(
            frame.payload,
            MessagePayload::TagReading {
                tag: "B3:0/2".into(),
                value: TagValue::Bool(true),
            }
        );

        // CONNECTED is emitted once, on the first success only.
        let second = h.message.next_frame().await.unwrap();
        assert!(matches!(
            second.payload,
            MessagePayload::TagReading { .. }
        ));
        h.adapter.stop().await;
        drop(h.adapter); // release the adapter's bus senders so the bus closes
        let rest = collect_events(&mut h.control).await;
        assert_eq!(rest.last(), Some(&ControlEvent::Stopping));
        assert!(!rest.contains(&ControlEvent::Connected));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn timeout_breaks_the_sweep_and_arms_backoff() {
        // Tag A succeeds, tag B times out, tag C must not be read this tick.
        let driver = Arc::new(ScriptedDriver::default());
        driver.script("A", vec![Script::Value(TagValue::Bool(true))]);
        driver.script("B", vec![Script::Timeout]);
        // "C" is deliberately unscripted: reading it would panic the task.

        let cfg = config(vec![
            TagConfig::new(MapperKind::Bool, "A"),
            TagConfig::new(MapperKind::Bool, "B"),
            TagConfig::new(MapperKind::Bool, "C"),
        ]);
        let mut h = harness(cfg, driver);
        h.adapter.start();

        // Exactly one message frame for A this tick.
        let frame = h.message.next_frame().await.unwrap();
        assert_eq!(
            frame.payload,
            MessagePayload::TagReading {
                tag: "A".into(),
                value: TagValue::Bool(true),
            }
        );

        // The next sweep is delayed by the backoff interval (2000ms), not
        // the read interval (100ms).
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(h.message.try_next_frame().is_none());
        tokio::time::sleep(Duration::from_millis(1900)).await;
        let frame = h.message.next_frame().await.unwrap();
        assert!(matches!(frame.payload, MessagePayload::TagReading { .. }));

        h.adapter.stop().await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn backoff_clears_on_the_next_successful_read() {
        let driver = Arc::new(ScriptedDriver::default());
        driver.script(
            "A",
            vec![
                Script::Timeout,
                Script::Value(TagValue::Int16(7)),
                Script::Value(TagValue::Int16(8)),
            ],
        );

        let mut h = harness(config(vec![TagConfig::new(MapperKind::Int16, "A")]), driver);
        h.adapter.start();

        // First sweep timed out; second comes after the backoff interval.
        let first = h.message.next_frame().await.unwrap();
        assert_eq!(
            first.payload,
            MessagePayload::TagReading {
                tag: "A".into(),
                value: TagValue::Int16(7),
            }
        );

        // Backoff cleared: the third reading follows one read interval later.
        tokio::time::sleep(Duration::from_millis(150)).await;
        let second = h.message.next_frame().await.unwrap();
        assert_eq!(
            second.payload,
            MessagePayload::TagReading {
                tag: "A".into(),
                value: TagValue::Int16(8),
            }
        );

        h.adapter.stop().await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn non_timeout_error_disables_only_that_tag() {
        let driver = Arc::new(ScriptedDriver::default());
        driver.script("bad", vec![Script::Error("no such tag")]);
        driver.script("good", vec![Script::Value(TagValue::Bool(false))]);

        let mut cfg = config(vec![
            TagConfig::new(MapperKind::Bool, "bad"),
            TagConfig::new(MapperKind::Bool, "good"),
        ]);
        cfg.remove_tag_on_error = true;

        let mut h = harness(cfg, driver);
        h.adapter.start();

        // Two sweeps worth of frames: "bad" is disabled after the first
        // error, "good" keeps reporting.
        let first = h.message.next_frame().await.unwrap();
        let second = h.message.next_frame().await.unwrap();
        for frame in [first, second] {
            assert_eq!(
                frame.payload,
                MessagePayload::TagReading {
                    tag: "good".into(),
                    value: TagValue::Bool(false),
                }
            );
        }

        h.adapter.stop().await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn failed_handle_creation_skips_the_tag_not_the_adapter() {
        let driver = Arc::new(ScriptedDriver::default());
        driver.fail_create_for("missing");
        driver.script("present", vec![Script::Value(TagValue::Bool(true))]);

        let cfg = config(vec![
            TagConfig::new(MapperKind::Bool, "missing"),
            TagConfig::new(MapperKind::Bool, "present"),
        ]);
        let mut h = harness(cfg, driver);
        h.adapter.start();

        let frame = h.message.next_frame().await.unwrap();
        assert_eq!(
            frame.payload,
            MessagePayload::TagReading {
                tag: "present".into(),
                value: TagValue::Bool(true),
            }
        );
        h.adapter.stop().await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn a_panicking_read_is_fatal_not_silent() {
        // "A" is unscripted, so its first read panics inside the driver call.
        // The panic must surface as a fatal failure: ERROR with the detail,
        // then STOPPING, then a process-shutdown request.
        let driver = Arc::new(ScriptedDriver::default());
        let (ctl_tx, mut control) = FrameBus::channel();
        let (msg_tx, _message) = FrameBus::channel();
        let (requester, mut signal) = shutdown_channel();
        let mut adapter = PlcAdapter::new(
            config(vec![TagConfig::new(MapperKind::Bool, "A")]),
            driver,
            ctl_tx,
            msg_tx,
            requester,
        );
        adapter.start();

        assert_eq!(
            control.next_frame().await.unwrap().event,
            ControlEvent::Starting
        );
        let error = control.next_frame().await.unwrap();
        assert_eq!(error.event, ControlEvent::Error);
        assert!(error.detail.unwrap().contains("unscripted read"));
        assert_eq!(
            control.next_frame().await.unwrap().event,
            ControlEvent::Stopping
        );
        assert_eq!(signal.recv().await, Some(()));
        adapter.stop().await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn disabled_adapter_still_emits_starting_and_stopping() {
        let driver = Arc::new(ScriptedDriver::default());
        let mut cfg = config(vec![TagConfig::new(MapperKind::Bool, "A")]);
        cfg.enabled = false;

        let mut h = harness(cfg, driver);
        h.adapter.start();

        assert_eq!(
            h.control.next_frame().await.unwrap().event,
            ControlEvent::Starting
        );
        h.adapter.stop().await;
        assert_eq!(
            h.control.next_frame().await.unwrap().event,
            ControlEvent::Stopping
        );
        assert!(h.message.try_next_frame().is_none());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn double_stop_is_idempotent() {
        let driver = Arc::new(ScriptedDriver::default());
        driver.script("A", vec![Script::Value(TagValue::Bool(true))]);
        let mut h = harness(config(vec![TagConfig::new(MapperKind::Bool, "A")]), driver);

        h.adapter.start();
        h.adapter.stop().await;
        h.adapter.stop().await;
        drop(h.adapter);

        // Exactly one STOPPING frame, and nothing after it.
        let events = collect_events(&mut h.control).await;
        assert_eq!(
            events.iter().filter(|e| **e == ControlEvent::Stopping).count(),
            1
        );
        assert_eq!(events.last(), Some(&ControlEvent::Stopping));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn control_sequence_is_a_valid_state_machine_path() {
        let driver = Arc::new(ScriptedDriver::default());
        driver.script("A", vec![Script::Value(TagValue::Bool(true))]);
        let mut h = harness(config(vec![TagConfig::new(MapperKind::Bool, "A")]), driver);

        h.adapter.start();
        tokio::time::sleep(Duration::from_millis(350)).await;
        h.adapter.stop().await;
        drop(h.adapter);

        let events = collect_events(&mut h.control).await;
        assert_eq!(events.first(), Some(&ControlEvent::Starting));
        assert_eq!(events.last(), Some(&ControlEvent::Stopping));
        // CONNECTED never precedes STARTING and appears at most once.
        assert_eq!(
            events.iter().filter(|e| **e == ControlEvent::Connected).count(),
            1
        );
    }
}
