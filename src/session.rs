//! # Input Session
//!
//! Lifecycle controller that owns the devices, runs every reader and the
//! aggregator concurrently, and releases all captures on the way out.
//!
//! ## States
//!
//! ```text
//! Idle --start()--> Running --all units ended--> Stopped | Failed
//! ```
//!
//! `Failed` means at least one unit ended with an error (a device that could not
//! be opened or grabbed, or one that failed mid-read). The other units keep
//! running in that case, so a session is only ever ended by [`StopHandle::stop`]
//! or by dropping the `start()` future.
//!
//! ## Usage
//!
//! ```no_run
//! use deck_input::config::Config;
//! use deck_input::session::DeckInput;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut deck = DeckInput::new(Config::default());
//!     deck.add_listener(|field, value| println!("{} -> {}", field, value));
//!
//!     let stop = deck.stop_handle();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         stop.stop();
//!     });
//!
//!     deck.start().await?;
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::aggregator::{Aggregator, Thresholds};
use crate::config::Config;
use crate::controller::bucket::bucket;
use crate::controller::field::{Field, FieldValue};
use crate::controller::hidraw::HidrawDevice;
use crate::controller::keys::EvdevKeyDevice;
use crate::dispatcher::{Dispatcher, InputListener, ListenerId};
use crate::error::{DeckInputError, Result};
use crate::reader::key_reader::run_key_reader;
use crate::reader::report_reader::{run_report_reader, ReportReaderSettings};
use crate::reader::{KeySource, ReportSource};

/// Lifecycle state of a [`DeckInput`] session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    /// Every unit ended cleanly after a stop request.
    Stopped,
    /// At least one unit ended with an error.
    Failed,
}

/// Cloneable handle to stop a running session from elsewhere.
#[derive(Debug, Clone)]
pub struct StopHandle {
    cancel: CancellationToken,
    state: watch::Receiver<SessionState>,
}

impl StopHandle {
    /// Requests cooperative shutdown of every reader and the aggregator.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Current state of the session.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }
}

/// Opened device handles for one session.
///
/// Built by [`DeckInput::start`] from the configured paths, or by callers that
/// supply their own sources to [`DeckInput::start_with_sources`].
#[derive(Default)]
pub struct Sources {
    /// Device whose power/volume keys are recorded
    pub keys: Option<Box<dyn KeySource>>,
    /// Devices grabbed only to keep their events from other consumers
    pub muted: Vec<Box<dyn KeySource>>,
    /// Raw controller report device
    pub report: Option<Box<dyn ReportSource>>,
}

impl std::fmt::Debug for Sources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sources")
            .field("keys", &self.keys.as_ref().map(|s| s.path().to_string()))
            .field("muted", &self.muted.iter().map(|s| s.path().to_string()).collect::<Vec<_>>())
            .field("report", &self.report.as_ref().map(|s| s.path().to_string()))
            .finish()
    }
}

/// Steam Deck input session
pub struct DeckInput {
    config: Config,
    dispatcher: Dispatcher,
    cancel: CancellationToken,
    state: watch::Sender<SessionState>,
}

impl std::fmt::Debug for DeckInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeckInput")
            .field("state", &self.state())
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl DeckInput {
    pub fn new(config: Config) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            config,
            dispatcher: Dispatcher::new(),
            cancel: CancellationToken::new(),
            state,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registers a change callback. Listeners run in registration order.
    pub fn add_listener<F>(&mut self, callback: F) -> ListenerId
    where
        F: FnMut(Field, FieldValue) + Send + 'static,
    {
        self.dispatcher.add_fn(callback)
    }

    /// Registers a fallible listener; its errors are logged, not propagated.
    pub fn add_input_listener(&mut self, listener: impl InputListener + 'static) -> ListenerId {
        self.dispatcher.add_listener(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.dispatcher.remove_listener(id)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            cancel: self.cancel.clone(),
            state: self.state.subscribe(),
        }
    }

    /// Requests shutdown. Equivalent to [`StopHandle::stop`].
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Open the configured devices and run until stopped
    ///
    /// Returns once every reader and the aggregator have ended. Device
    /// failures are logged and reflected in the returned state, never
    /// returned as errors.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyStarted` if the session is not `Idle`.
    pub async fn start(&mut self) -> Result<SessionState> {
        self.begin()?;
        let guard = RunGuard::new(&self.cancel, &self.state);
        let sources = self.open_sources(&guard).await;
        run_units(&self.config, &mut self.dispatcher, sources, &guard).await;
        drop(guard);
        Ok(self.state())
    }

    /// Run with caller-supplied device handles
    ///
    /// # Errors
    ///
    /// Returns `AlreadyStarted` if the session is not `Idle`.
    pub async fn start_with_sources(&mut self, sources: Sources) -> Result<SessionState> {
        self.begin()?;
        let guard = RunGuard::new(&self.cancel, &self.state);
        run_units(&self.config, &mut self.dispatcher, sources, &guard).await;
        drop(guard);
        Ok(self.state())
    }

    fn begin(&mut self) -> Result<()> {
        if self.state() != SessionState::Idle {
            return Err(DeckInputError::AlreadyStarted);
        }
        self.state.send_replace(SessionState::Running);
        info!("Session starting");
        Ok(())
    }

    /// Opens every configured device; failures are logged and counted.
    async fn open_sources(&self, guard: &RunGuard<'_>) -> Sources {
        let devices = &self.config.devices;
        let mut sources = Sources::default();

        match self.open_with_retry(&devices.key_device, EvdevKeyDevice::open).await {
            Ok(device) => sources.keys = Some(Box::new(device)),
            Err(e) => guard.unit_failed(&e),
        }

        for path in &devices.muted_devices {
            match self.open_with_retry(path, EvdevKeyDevice::open).await {
                Ok(device) => sources.muted.push(Box::new(device)),
                Err(e) => guard.unit_failed(&e),
            }
        }

        match self.open_with_retry(&devices.hidraw, HidrawDevice::open).await {
            Ok(device) => sources.report = Some(Box::new(device)),
            Err(e) => guard.unit_failed(&e),
        }

        sources
    }

    /// Bounded retry around a device open.
    async fn open_with_retry<T>(
        &self,
        path: &str,
        open: impl Fn(&str) -> Result<T>,
    ) -> Result<T> {
        let retries = self.config.timing.open_retries;
        let delay = Duration::from_millis(self.config.timing.open_retry_delay_ms);
        let mut attempt = 0;

        loop {
            match open(path) {
                Ok(device) => return Ok(device),
                Err(e) if attempt < retries && !self.cancel.is_cancelled() => {
                    attempt += 1;
                    warn!("{} (retry {}/{} in {:?})", e, attempt, retries, delay);
                    tokio::select! {
                        _ = self.cancel.cancelled() => return Err(e),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Ends a running session, however `start()` returns
///
/// On drop it cancels every unit and moves the state from `Running` to
/// `Failed` if any unit failed, otherwise to `Stopped`. This also covers the
/// `start()` future being dropped mid-run.
struct RunGuard<'a> {
    cancel: CancellationToken,
    state: &'a watch::Sender<SessionState>,
    failures: AtomicUsize,
}

impl<'a> RunGuard<'a> {
    fn new(cancel: &CancellationToken, state: &'a watch::Sender<SessionState>) -> Self {
        Self {
            cancel: cancel.clone(),
            state,
            failures: AtomicUsize::new(0),
        }
    }

    fn unit_failed(&self, err: &dyn std::fmt::Display) {
        error!("{}", err);
        self.failures.fetch_add(1, Ordering::Relaxed);
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.cancel.cancel();

        let failures = self.failures.load(Ordering::Relaxed);
        let final_state = if failures > 0 {
            SessionState::Failed
        } else {
            SessionState::Stopped
        };
        let ended = self.state.send_if_modified(|state| {
            if *state != SessionState::Running {
                return false;
            }
            *state = final_state;
            true
        });
        if ended {
            info!("Session ended: {:?} ({} failed units)", final_state, failures);
        }
    }
}

/// Runs every reader and the aggregator until all of them have ended.
async fn run_units(
    config: &Config,
    dispatcher: &mut Dispatcher,
    sources: Sources,
    guard: &RunGuard<'_>,
) {
    let cancel = &guard.cancel;
    let (key_writer, key_reader) = bucket("keys");
    let (report_writer, report_reader) = bucket("report");

    let mut aggregator = Aggregator::new(
        vec![key_reader, report_reader],
        Thresholds::from(config),
        Duration::from_millis(config.timing.tick_interval_ms),
    );

    // Dropping the set aborts the readers; key devices release their grab on drop
    let mut readers = JoinSet::new();
    match sources.keys {
        Some(source) => {
            readers.spawn(run_key_reader(source, Some(key_writer), cancel.clone()));
        }
        None => drop(key_writer),
    }
    for source in sources.muted {
        readers.spawn(run_key_reader(source, None, cancel.clone()));
    }
    match sources.report {
        Some(source) => {
            readers.spawn(run_report_reader(
                source,
                report_writer,
                ReportReaderSettings::from(config),
                cancel.clone(),
            ));
        }
        None => drop(report_writer),
    }

    if readers.is_empty() {
        warn!("No input sources available; waiting for stop");
    } else {
        info!("Running {} readers", readers.len());
    }

    tokio::join!(
        aggregator.run(dispatcher, cancel),
        join_readers(&mut readers, guard),
    );
}

/// Waits for every reader, logging and counting the ones that failed.
async fn join_readers(readers: &mut JoinSet<Result<()>>, guard: &RunGuard<'_>) {
    while let Some(joined) = readers.join_next().await {
        match joined {
            Ok(Ok(())) => debug!("Reader finished"),
            Ok(Err(e)) => guard.unit_failed(&format_args!("Reader stopped: {}", e)),
            Err(e) => guard.unit_failed(&format_args!("Reader task failed: {}", e)),
        }
    }
}
