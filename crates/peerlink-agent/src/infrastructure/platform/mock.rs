//! In-memory platform for tests and simulation.
//!
//! None of these types touch a radio.  They record every call so tests can
//! assert on exactly what the application layer asked for:
//!
//! - [`MockRadio`] – a switchable on/off flag.
//! - [`MockScanSource`] – replays scripted sightings when a scan starts and
//!   keeps the sink so a test can inject more events later.
//! - [`MockTransport`] – refuses configured strategies and otherwise returns
//!   one end of an in-memory duplex pipe.  The far end is kept so tests can
//!   read what was written, or drop it to simulate the peer going away.
//! - [`RecordingObserver`] – stores every reported event.
//!
//! # Usage in tests
//!
//! ```ignore
//! let source = Arc::new(MockScanSource::new().with_sightings([Sighting::new("AA")]));
//! let discovery = DiscoveryController::new(radio, source.clone(), observer, config);
//!
//! discovery.start().await?;
//! source.fail("adapter reset");
//! ```

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use peerlink_core::{NegotiationMode, PeerAddress, ScanState, Sighting, Strategy};
use tokio::io::DuplexStream;

use crate::application::events::CoreEvent;
use crate::application::ports::{
    BoxedStream, Observer, PlatformError, RadioState, ScanEventSink, ScanSource, TransportFactory,
};

/// Buffer size of each in-memory stream.
pub const MOCK_STREAM_BUFFER: usize = 4096;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Radio ─────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct MockRadio {
    enabled: AtomicBool,
}

impl MockRadio {
    pub fn enabled() -> Self {
        Self {
            enabled: AtomicBool::new(true),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: AtomicBool::new(false),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl RadioState for MockRadio {
    fn is_radio_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

// ── Scan source ───────────────────────────────────────────────────────────────

/// Scripted scanner.
///
/// By default it never acknowledges a stop request, which is the worst case
/// the discovery controller has to handle.
#[derive(Debug, Default)]
pub struct MockScanSource {
    initial: Vec<Sighting>,
    start_failure: Option<String>,
    error_while_starting: Option<String>,
    acknowledge_stop: bool,
    sink: Mutex<Option<ScanEventSink>>,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
}

impl MockScanSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sightings delivered as soon as a scan starts.
    pub fn with_sightings(mut self, sightings: impl IntoIterator<Item = Sighting>) -> Self {
        self.initial.extend(sightings);
        self
    }

    /// Makes every `start_scan` fail with `reason`.
    pub fn rejecting_start(mut self, reason: impl Into<String>) -> Self {
        self.start_failure = Some(reason.into());
        self
    }

    /// Makes `start_scan` report `reason` through the sink and then return
    /// `Ok`, the way a platform surfaces a permission denial asynchronously.
    pub fn failing_while_starting(mut self, reason: impl Into<String>) -> Self {
        self.error_while_starting = Some(reason.into());
        self
    }

    /// Makes `stop_scan` send a stop acknowledgement.
    pub fn acknowledging_stop(mut self) -> Self {
        self.acknowledge_stop = true;
        self
    }

    /// Delivers a sighting into the running scan.  Returns `false` if no
    /// scan is running or the sighting was dropped.
    pub fn emit(&self, sighting: Sighting) -> bool {
        lock(&self.sink)
            .as_ref()
            .is_some_and(|sink| sink.try_sighting(sighting))
    }

    /// Reports a platform error into the running scan.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        lock(&self.sink)
            .as_ref()
            .is_some_and(|sink| sink.error(reason))
    }

    pub fn start_count(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScanSource for MockScanSource {
    async fn start_scan(&self, sink: ScanEventSink) -> Result<(), PlatformError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.start_failure {
            return Err(PlatformError::new(reason.clone()));
        }
        for sighting in &self.initial {
            sink.try_sighting(sighting.clone());
        }
        if let Some(reason) = &self.error_while_starting {
            sink.error(reason.clone());
        }
        *lock(&self.sink) = Some(sink);
        Ok(())
    }

    async fn stop_scan(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        if self.acknowledge_stop {
            if let Some(sink) = lock(&self.sink).as_ref() {
                sink.stop_acknowledged();
            }
        }
    }
}

// ── Transport ─────────────────────────────────────────────────────────────────

/// In-memory transport with per-mode refusals.
#[derive(Debug, Default)]
pub struct MockTransport {
    /// `(None, mode)` refuses `mode` for every peer.
    refusals: HashMap<(Option<PeerAddress>, NegotiationMode), String>,
    /// Every `open_stream` call in order.
    pub calls: Mutex<Vec<(PeerAddress, Strategy)>>,
    remotes: Mutex<Vec<(PeerAddress, DuplexStream)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses `mode` for every peer.
    pub fn refuse(mut self, mode: NegotiationMode, reason: impl Into<String>) -> Self {
        self.refusals.insert((None, mode), reason.into());
        self
    }

    /// Refuses `mode` for one peer only.
    pub fn refuse_for(
        mut self,
        address: impl Into<PeerAddress>,
        mode: NegotiationMode,
        reason: impl Into<String>,
    ) -> Self {
        self.refusals
            .insert((Some(address.into()), mode), reason.into());
        self
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn calls(&self) -> Vec<(PeerAddress, Strategy)> {
        lock(&self.calls).clone()
    }

    /// Takes the far end of the most recently opened stream.
    pub fn take_remote(&self) -> Option<DuplexStream> {
        lock(&self.remotes).pop().map(|(_, stream)| stream)
    }

    fn refusal(&self, target: &PeerAddress, mode: NegotiationMode) -> Option<&String> {
        self.refusals
            .get(&(Some(target.clone()), mode))
            .or_else(|| self.refusals.get(&(None, mode)))
    }
}

#[async_trait]
impl TransportFactory for MockTransport {
    async fn open_stream(&self, target: &PeerAddress, strategy: &Strategy) -> io::Result<BoxedStream> {
        lock(&self.calls).push((target.clone(), *strategy));
        if let Some(reason) = self.refusal(target, strategy.mode) {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, reason.clone()));
        }
        let (local, remote) = tokio::io::duplex(MOCK_STREAM_BUFFER);
        lock(&self.remotes).push((target.clone(), remote));
        Ok(Box::new(local))
    }
}

// ── Observer ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<CoreEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CoreEvent> {
        lock(&self.events).clone()
    }

    /// States from every `ScanStateChanged` event, in order.
    pub fn scan_states(&self) -> Vec<ScanState> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                CoreEvent::ScanStateChanged { state, .. } => Some(*state),
                _ => None,
            })
            .collect()
    }
}

impl Observer for RecordingObserver {
    fn notify(&self, event: CoreEvent) {
        lock(&self.events).push(event);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
