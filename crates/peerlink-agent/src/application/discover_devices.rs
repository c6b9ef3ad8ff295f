//! DiscoveryController: drives one time-bounded scan session at a time.
//!
//! # How a session runs
//!
//! 1. [`DiscoveryController::start_session`] checks the radio, clears the
//!    registry, and asks the [`ScanSource`] to start.  The source receives a
//!    [`ScanEventSink`](super::ports::ScanEventSink).
//! 2. Once the platform accepts, any error it already pushed through the sink
//!    turns the start into a [`DiscoveryError::ScanStartError`].  Otherwise
//!    the session becomes `Active` and a pump task is spawned.
//! 3. The session ends exactly once, whichever comes first:
//!    - the deadline elapses (the pump asks the source to stop and marks the
//!      session `Completed` without waiting for an acknowledgement);
//!    - the caller invokes [`DiscoveryController::stop`];
//!    - the platform reports an error (`Failed`).
//!
//! A stop requested while the platform is still starting is remembered and
//! applied the moment the session activates, so the caller gets back a
//! session that is already `Completed`.
//!
//! Every terminal transition goes through the session state machine under
//! one lock, so a late deadline, a second stop, or a duplicate error finds
//! the session already terminal and does nothing.
//!
//! # Why a queue and a pump? (for beginners)
//!
//! Radio stacks call back on threads they own, often several at once, and
//! they do not wait for us.  If every callback locked the registry directly,
//! the order in which peers were recorded would depend on thread scheduling,
//! and a slow observer would stall the platform's thread.
//!
//! Instead, callbacks only push into a queue:
//!
//! - **Sightings** go into a *bounded* channel.  When it is full the newest
//!   sighting is dropped with a warning; the platform is never blocked and the
//!   session carries on.
//! - **Lifecycle signals** (errors, stop acknowledgements) go into a separate
//!   *unbounded* channel, so a flood of sightings can never hide an error.
//!
//! The pump is a single task that owns the receiving ends.  It waits on four
//! things at once with `tokio::select!`, checked in this priority order:
//!
//! 1. the session was ended elsewhere (stop or `on_scan_error`), so exit;
//! 2. the deadline timer fired, so complete the session;
//! 3. a lifecycle signal arrived;
//! 4. a sighting arrived, so apply it to the registry.
//!
//! Because there is exactly one consumer, sightings reach the registry one at
//! a time in arrival order, no matter how many threads produced them.
//!
//! ```text
//! platform thread ──► ScanEventSink ──► [bounded queue] ──► pump ──► registry
//!                                                             │
//!                                     deadline / stop / error ┘
//! ```
//!
//! Observers are notified after the state lock is released, so an observer
//! may call back into the controller.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use peerlink_core::{
    CompletionReason, DeviceRegistry, PeerDevice, ScanSession, ScanState, Sighting,
    MAX_SCAN_DURATION,
};
use thiserror::Error;
use tokio::sync::{watch, Notify};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::events::CoreEvent;
use super::ports::{Observer, RadioState, ScanEventQueue, ScanEventSink, ScanSignal, ScanSource};

/// Error type for discovery operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// The radio is switched off or not supported.  Needs user action.
    #[error("scanning unavailable: radio is disabled or unsupported")]
    ScanUnavailable,
    /// The platform rejected the start request.  May succeed if retried.
    #[error("platform rejected scan start: {0}")]
    ScanStartError(String),
    /// A session is already starting or running.
    #[error("a scan session is already in progress")]
    AlreadyScanning,
}

/// Discovery settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// How long a session runs before it completes on its own.
    pub scan_duration: Duration,
    /// Capacity of the bounded sighting queue between the platform and the
    /// controller.
    pub event_queue_capacity: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            scan_duration: Duration::from_secs(10),
            event_queue_capacity: 64,
        }
    }
}

/// How a session ends.
#[derive(Debug)]
enum Finish {
    Completed(CompletionReason),
    Failed(String),
}

/// Outcome of moving a started session to `Active`.
enum Activation {
    Running(ScanSession),
    /// A stop arrived while the platform was starting.
    StoppedWhileStarting(ScanSession),
}

#[derive(Default)]
struct DiscoveryState {
    session: Option<ScanSession>,
    registry: DeviceRegistry,
    /// Wakes the running pump so it exits once the session is terminal.
    pump_stop: Option<Arc<Notify>>,
    /// Set by `stop` while the session is still `Idle`.
    stop_pending: bool,
}

struct Shared {
    radio: Arc<dyn RadioState>,
    source: Arc<dyn ScanSource>,
    observer: Arc<dyn Observer>,
    config: DiscoveryConfig,
    state: Mutex<DiscoveryState>,
    session_tx: watch::Sender<Option<ScanSession>>,
}

/// Drives scan sessions and owns the device registry.
///
/// Cloning is cheap; clones share the same sessions and registry.
#[derive(Clone)]
pub struct DiscoveryController {
    shared: Arc<Shared>,
}

impl DiscoveryController {
    pub fn new(
        radio: Arc<dyn RadioState>,
        source: Arc<dyn ScanSource>,
        observer: Arc<dyn Observer>,
        config: DiscoveryConfig,
    ) -> Self {
        let (session_tx, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                radio,
                source,
                observer,
                config,
                state: Mutex::new(DiscoveryState::default()),
                session_tx,
            }),
        }
    }

    /// Starts a session with the configured scan duration.
    ///
    /// # Errors
    ///
    /// See [`start_session`](Self::start_session).
    pub async fn start(&self) -> Result<ScanSession, DiscoveryError> {
        self.start_session(self.shared.config.scan_duration).await
    }

    /// Starts a session that completes after `duration`.
    ///
    /// Clears the registry, so peers from a previous session never carry
    /// over.  Returns a snapshot of the now `Active` session, or of an
    /// already `Completed` one if [`stop`](Self::stop) was called while the
    /// platform was starting.  `duration` is clamped to
    /// [`MAX_SCAN_DURATION`].
    ///
    /// # Errors
    ///
    /// - [`DiscoveryError::AlreadyScanning`] if a session is starting or active.
    /// - [`DiscoveryError::ScanUnavailable`] if the radio is off or unsupported.
    /// - [`DiscoveryError::ScanStartError`] if the platform rejects the start,
    ///   either by returning an error or by reporting one through the sink
    ///   before `start_scan` returns.
    ///
    /// The last two also move the new session to `Failed` and report it.
    pub async fn start_session(&self, duration: Duration) -> Result<ScanSession, DiscoveryError> {
        let duration = duration.min(MAX_SCAN_DURATION);
        let now = Instant::now();
        let deadline = now.checked_add(duration).unwrap_or(now);
        let session_id = {
            let mut guard = self.shared.lock_state();
            let state = &mut *guard;
            if state
                .session
                .as_ref()
                .is_some_and(|s| !s.state().is_terminal())
            {
                return Err(DiscoveryError::AlreadyScanning);
            }
            state.registry.clear();
            state.stop_pending = false;
            let session = ScanSession::new(duration, SystemTime::now());
            let id = session.id();
            self.shared.session_tx.send_replace(Some(session.clone()));
            state.session = Some(session);
            id
        };

        if !self.shared.radio.is_radio_enabled() {
            warn!("cannot start scan: radio disabled or unsupported");
            self.shared.finish(
                Some(session_id),
                Finish::Failed("radio disabled or unsupported".to_string()),
            );
            return Err(DiscoveryError::ScanUnavailable);
        }

        let (sink, mut queue) = ScanEventSink::channel(self.shared.config.event_queue_capacity);
        if let Err(e) = self.shared.source.start_scan(sink).await {
            warn!("platform rejected scan start: {e}");
            self.shared.finish(Some(session_id), Finish::Failed(e.0.clone()));
            return Err(DiscoveryError::ScanStartError(e.0));
        }

        if let Some(reason) = take_start_error(&mut queue) {
            warn!(session = %session_id, "platform failed the scan while starting: {reason}");
            self.shared.finish(Some(session_id), Finish::Failed(reason.clone()));
            self.shared.source.stop_scan().await;
            return Err(DiscoveryError::ScanStartError(reason));
        }

        let pump_stop = Arc::new(Notify::new());
        let mut events = Vec::with_capacity(2);
        let activated = {
            let mut guard = self.shared.lock_state();
            let state = &mut *guard;
            let found = state.registry.len();
            match state.session.as_mut().filter(|s| s.id() == session_id) {
                Some(session) => match session.activate() {
                    Ok(()) => {
                        events.push(self.shared.publish(session, found));
                        if state.stop_pending
                            && session.complete(CompletionReason::StopRequested).is_ok()
                        {
                            state.stop_pending = false;
                            events.push(self.shared.publish(session, found));
                            Ok(Activation::StoppedWhileStarting(session.clone()))
                        } else {
                            state.pump_stop = Some(Arc::clone(&pump_stop));
                            Ok(Activation::Running(session.clone()))
                        }
                    }
                    Err(_) => Err(session
                        .error_reason()
                        .unwrap_or("scan ended before it became active")
                        .to_string()),
                },
                None => Err("scan session was superseded while starting".to_string()),
            }
        };
        self.shared.deliver(events);

        match activated {
            Ok(Activation::Running(snapshot)) => {
                info!(session = %session_id, ?duration, "scan session active");
                tokio::spawn(run_session(
                    Arc::clone(&self.shared),
                    session_id,
                    deadline,
                    queue,
                    pump_stop,
                ));
                Ok(snapshot)
            }
            Ok(Activation::StoppedWhileStarting(snapshot)) => {
                info!(session = %session_id, "scan stopped while the platform was starting");
                self.shared.source.stop_scan().await;
                Ok(snapshot)
            }
            Err(reason) => {
                warn!(session = %session_id, "scan did not become active: {reason}");
                self.shared.source.stop_scan().await;
                Err(DiscoveryError::ScanStartError(reason))
            }
        }
    }

    /// Stops the session early.
    ///
    /// Idempotent: if the session already completed (by deadline, by a
    /// previous stop, or by failure) this does nothing.  While the platform
    /// is still starting, the stop is deferred until the session activates.
    pub async fn stop(&self) {
        if self.shared.defer_stop_while_starting() {
            return;
        }
        if self
            .shared
            .finish(None, Finish::Completed(CompletionReason::StopRequested))
        {
            self.shared.source.stop_scan().await;
        }
    }

    /// Applies a sighting to the current session.
    ///
    /// Ignored (with a debug log) unless the session is `Active`.  Returns
    /// the updated record when the sighting was accepted.
    pub fn on_sighting_event(&self, sighting: Sighting) -> Option<PeerDevice> {
        self.shared.record(None, sighting)
    }

    /// Marks the current session `Failed` with `reason`.
    ///
    /// Sightings arriving afterwards are ignored.
    pub fn on_scan_error(&self, reason: impl Into<String>) {
        self.shared.finish(None, Finish::Failed(reason.into()));
    }

    /// Snapshot of the registry, in first-seen order.
    pub fn devices(&self) -> Vec<PeerDevice> {
        self.shared.lock_state().registry.list_all().to_vec()
    }

    /// Snapshot of the most recent session, if any.
    pub fn current_session(&self) -> Option<ScanSession> {
        self.shared.lock_state().session.clone()
    }

    /// Subscribes to session state changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<ScanSession>> {
        self.shared.session_tx.subscribe()
    }

    /// Waits until the most recent session reaches a terminal state and
    /// returns it.  Returns `None` if no session was ever started.
    pub async fn wait_for_completion(&self) -> Option<ScanSession> {
        let mut rx = self.shared.session_tx.subscribe();
        let finished = rx
            .wait_for(|s| s.as_ref().map_or(true, |s| s.state().is_terminal()))
            .await;
        match finished {
            Ok(current) => Option::clone(&current),
            Err(_) => None,
        }
    }
}

/// Returns the first error the platform pushed while `start_scan` ran.
fn take_start_error(queue: &mut ScanEventQueue) -> Option<String> {
    let mut error = None;
    while let Ok(signal) = queue.signals.try_recv() {
        if let ScanSignal::Error(reason) = signal {
            error.get_or_insert(reason);
        }
    }
    error
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, DiscoveryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pushes a session snapshot to the watch channel and returns the event
    /// to report once the state lock is released.
    fn publish(&self, session: &ScanSession, devices_found: usize) -> CoreEvent {
        self.session_tx.send_replace(Some(session.clone()));
        CoreEvent::scan_state(session, devices_found)
    }

    /// Reports events.  Must be called without the state lock held.
    fn deliver(&self, events: impl IntoIterator<Item = CoreEvent>) {
        for event in events {
            self.observer.notify(event);
        }
    }

    /// Remembers a stop requested while the current session is `Idle`.
    fn defer_stop_while_starting(&self) -> bool {
        let mut state = self.lock_state();
        if state
            .session
            .as_ref()
            .is_some_and(|s| s.state() == ScanState::Idle)
        {
            debug!("scan still starting; stop deferred until it is active");
            state.stop_pending = true;
            return true;
        }
        false
    }

    /// Records a sighting if `session_id` (or, when `None`, the current
    /// session) is active.
    fn record(&self, session_id: Option<Uuid>, sighting: Sighting) -> Option<PeerDevice> {
        let (device, discovered) = {
            let mut guard = self.lock_state();
            let state = &mut *guard;
            let Some(session) = state.session.as_ref() else {
                debug!(address = %sighting.address, "ignoring sighting: no scan session");
                return None;
            };
            if session_id.is_some_and(|id| id != session.id()) || !session.accepts_sightings() {
                debug!(
                    address = %sighting.address,
                    state = ?session.state(),
                    "ignoring sighting outside an active session"
                );
                return None;
            }

            let is_new = !state.registry.contains(&sighting.address);
            let device = state.registry.record_sighting(sighting).clone();
            let discovered = is_new.then(|| {
                debug!("discovered {device}");
                CoreEvent::DeviceDiscovered {
                    session_id: session.id(),
                    device: device.clone(),
                }
            });
            (device, discovered)
        };

        self.deliver(discovered);
        Some(device)
    }

    /// Moves the session to a terminal state and reports it.
    ///
    /// Returns `false` (and reports nothing) when the session is already
    /// terminal, has been replaced, or is still `Idle` and being asked to
    /// complete.
    fn finish(&self, session_id: Option<Uuid>, outcome: Finish) -> bool {
        let event = {
            let mut guard = self.lock_state();
            let state = &mut *guard;
            let Some(session) = state.session.as_mut() else {
                return false;
            };
            if session_id.is_some_and(|id| id != session.id()) {
                return false;
            }

            let result = match outcome {
                Finish::Completed(reason) => session.complete(reason),
                Finish::Failed(reason) => session.fail(reason),
            };
            if let Err(e) = result {
                debug!(session = %session.id(), "{e}; ignoring");
                return false;
            }

            if let Some(pump_stop) = state.pump_stop.take() {
                pump_stop.notify_one();
            }
            let found = state.registry.len();
            match session.error_reason() {
                Some(reason) => warn!(session = %session.id(), "scan failed: {reason}"),
                None => info!(session = %session.id(), "scan complete; found {found} device(s)"),
            }
            self.publish(session, found)
        };

        self.deliver([event]);
        true
    }
}

/// Serialises queue delivery, the deadline, and early stops for one session.
async fn run_session(
    shared: Arc<Shared>,
    session_id: Uuid,
    deadline: Instant,
    mut queue: ScanEventQueue,
    pump_stop: Arc<Notify>,
) {
    let expiry = tokio::time::sleep_until(deadline);
    tokio::pin!(expiry);

    loop {
        tokio::select! {
            biased;

            _ = pump_stop.notified() => break,

            _ = &mut expiry => {
                if shared.finish(
                    Some(session_id),
                    Finish::Completed(CompletionReason::DeadlineElapsed),
                ) {
                    // Completion does not wait for the platform to confirm.
                    shared.source.stop_scan().await;
                }
                break;
            }

            Some(signal) = queue.signals.recv() => match signal {
                ScanSignal::Error(reason) => {
                    shared.finish(Some(session_id), Finish::Failed(reason));
                    break;
                }
                ScanSignal::StopAcknowledged => {
                    debug!(session = %session_id, "platform acknowledged scan stop");
                }
            },

            Some(sighting) = queue.sightings.recv() => {
                shared.record(Some(session_id), sighting);
            }
        }
    }

    debug!(session = %session_id, "scan event pump exited");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
