//! [`Observer`] implementations.
//!
//! The core pushes every [`CoreEvent`] to exactly one observer.  These
//! adapters decide where the event goes:
//!
//! - [`ChannelObserver`] – forwards into a tokio channel for a UI task.
//! - [`TracingObserver`] – logs each event at `info`/`warn`.
//! - [`JsonLinesObserver`] – writes one JSON object per line.
//! - [`FanoutObserver`] – delivers to several observers in order.
//!
//! `notify` is called from inside the core, sometimes while it holds its own
//! lock, so none of these block on a consumer.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{info, warn};

use crate::application::events::CoreEvent;
use crate::application::ports::Observer;

/// Forwards events into a bounded channel, dropping them when it is full.
pub struct ChannelObserver {
    tx: mpsc::Sender<CoreEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::Sender<CoreEvent>) -> Self {
        Self { tx }
    }

    /// Creates an observer plus the receiver a consumer reads from.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<CoreEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

impl Observer for ChannelObserver {
    fn notify(&self, event: CoreEvent) {
        match self.tx.try_send(event) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(event)) => {
                warn!("observer channel full; dropping {event:?}");
            }
        }
    }
}

/// Logs every event through `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn notify(&self, event: CoreEvent) {
        match &event {
            CoreEvent::ScanStateChanged {
                state,
                devices_found,
                error: Some(reason),
                ..
            } => warn!(?state, devices_found, "scan state changed: {reason}"),
            CoreEvent::ScanStateChanged {
                state,
                devices_found,
                ..
            } => info!(?state, devices_found, "scan state changed"),
            CoreEvent::DeviceDiscovered { device, .. } => info!("discovered {device}"),
            CoreEvent::TargetSelected { target: Some(device) } => info!("target: {device}"),
            CoreEvent::TargetSelected { target: None } => info!("no target matched"),
            CoreEvent::ConnectionSkipped { target, reason } => {
                warn!("connection to {target} skipped: {reason}")
            }
            CoreEvent::ConnectionAttemptFailed { target, attempt } => {
                warn!("{target}: {attempt}")
            }
            CoreEvent::Connected { target, strategy } => info!("connected to {target} ({strategy})"),
            CoreEvent::ConnectionExhausted { target, attempts } => {
                warn!("{target}: all {} strategies failed", attempts.len())
            }
            CoreEvent::WriteCompleted { target, bytes } => info!("wrote {bytes} byte(s) to {target}"),
            CoreEvent::WriteFailed { target, reason } => warn!("write to {target} failed: {reason}"),
        }
    }
}

/// Writes each event as a single line of JSON.
pub struct JsonLinesObserver<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesObserver<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> Observer for JsonLinesObserver<W> {
    fn notify(&self, event: CoreEvent) {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                warn!("failed to serialise event: {e}");
                return;
            }
        };
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            warn!("failed to write event: {e}");
        }
    }
}

/// Delivers each event to every inner observer, in registration order.
#[derive(Default)]
pub struct FanoutObserver {
    observers: Vec<Arc<dyn Observer>>,
}

impl FanoutObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl Observer for FanoutObserver {
    fn notify(&self, event: CoreEvent) {
        if let Some((last, rest)) = self.observers.split_last() {
            for observer in rest {
                observer.notify(event.clone());
            }
            last.notify(event);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::platform::mock::RecordingObserver;
    use peerlink_core::PeerAddress;

    fn write_event(bytes: usize) -> CoreEvent {
        CoreEvent::WriteCompleted {
            target: PeerAddress::new("AA"),
            bytes,
        }
    }

    #[tokio::test]
    async fn test_channel_observer_forwards_and_drops_when_full() {
        // Arrange
        let (observer, mut rx) = ChannelObserver::channel(1);

        // Act
        observer.notify(write_event(1));
        observer.notify(write_event(2));

        // Assert
        assert_eq!(rx.recv().await, Some(write_event(1)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_json_lines_observer_writes_one_object_per_line() {
        // Arrange
        let observer = JsonLinesObserver::new(Vec::new());

        // Act
        observer.notify(write_event(3));
        observer.notify(CoreEvent::TargetSelected { target: None });

        // Assert
        let text = String::from_utf8(observer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "write_completed");
        assert_eq!(first["bytes"], 3);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["target"], serde_json::Value::Null);
    }

    #[test]
    fn test_fanout_observer_delivers_to_every_observer() {
        let a = Arc::new(RecordingObserver::new());
        let b = Arc::new(RecordingObserver::new());
        let fanout = FanoutObserver::new()
            .with(a.clone())
            .with(b.clone())
            .with(Arc::new(TracingObserver));

        fanout.notify(write_event(7));

        assert_eq!(a.events(), vec![write_event(7)]);
        assert_eq!(b.events(), vec![write_event(7)]);
    }
}
