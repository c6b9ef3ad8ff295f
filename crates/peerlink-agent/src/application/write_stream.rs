//! StreamWriter: sends a payload over an open [`Connection`].
//!
//! A write is `write_all` followed by `flush`; it either delivers every byte
//! or fails.  There is no retry here.  The outcome is reported to the
//! observer and returned to the caller.

use std::io;
use std::sync::Arc;

use peerlink_core::PeerAddress;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::connect_target::Connection;
use super::events::CoreEvent;
use super::ports::Observer;

#[derive(Debug, Error)]
pub enum WriteError {
    /// The stream rejected the write, typically because it was closed.
    #[error("write to {address} failed: {source}")]
    WriteFailed {
        address: PeerAddress,
        #[source]
        source: io::Error,
    },
}

pub struct StreamWriter {
    observer: Arc<dyn Observer>,
}

impl StreamWriter {
    pub fn new(observer: Arc<dyn Observer>) -> Self {
        Self { observer }
    }

    /// Writes `payload` to `connection` and flushes.
    ///
    /// An empty payload still flushes and reports a zero-byte write.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::WriteFailed`] if the stream is closed or the
    /// transport reports an I/O error.
    pub async fn write(&self, connection: &mut Connection, payload: &[u8]) -> Result<(), WriteError> {
        let address = connection.address().clone();
        let stream = connection.stream_mut();

        let result = async {
            stream.write_all(payload).await?;
            stream.flush().await
        }
        .await;

        match result {
            Ok(()) => {
                debug!("wrote {} byte(s) to {address}", payload.len());
                self.observer.notify(CoreEvent::WriteCompleted {
                    target: address,
                    bytes: payload.len(),
                });
                Ok(())
            }
            Err(source) => {
                warn!("write to {address} failed: {source}");
                self.observer.notify(CoreEvent::WriteFailed {
                    target: address.clone(),
                    reason: source.to_string(),
                });
                Err(WriteError::WriteFailed { address, source })
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::platform::mock::RecordingObserver;
    use peerlink_core::{PeerDevice, Sighting, Strategy};
    use std::time::SystemTime;
    use tokio::io::AsyncReadExt;

    fn connection_over(stream: tokio::io::DuplexStream) -> Connection {
        let peer = PeerDevice::from_sighting(Sighting::new("AA"), SystemTime::UNIX_EPOCH);
        Connection::new(
            peer,
            Strategy::default_sequence()[0],
            Box::new(stream),
        )
    }

    #[tokio::test]
    async fn test_write_delivers_payload_to_peer() {
        // Arrange
        let (local, mut remote) = tokio::io::duplex(64);
        let mut connection = connection_over(local);
        let observer = Arc::new(RecordingObserver::new());
        let writer = StreamWriter::new(observer.clone());

        // Act
        writer.write(&mut connection, b"Hello, World!").await.unwrap();

        // Assert
        let mut received = [0u8; 13];
        remote.read_exact(&mut received).await.unwrap();
        assert_eq!(&received, b"Hello, World!");
        assert_eq!(
            observer.events(),
            vec![CoreEvent::WriteCompleted {
                target: PeerAddress::new("AA"),
                bytes: 13,
            }]
        );
    }

    #[tokio::test]
    async fn test_write_after_peer_closed_fails() {
        // Arrange: remote end is gone
        let (local, remote) = tokio::io::duplex(64);
        drop(remote);
        let mut connection = connection_over(local);
        let observer = Arc::new(RecordingObserver::new());
        let writer = StreamWriter::new(observer.clone());

        // Act
        let err = writer.write(&mut connection, b"ping").await.unwrap_err();

        // Assert
        let WriteError::WriteFailed { address, .. } = err;
        assert_eq!(address.as_str(), "AA");
        assert!(matches!(
            observer.events().as_slice(),
            [CoreEvent::WriteFailed { .. }]
        ));
    }

    #[tokio::test]
    async fn test_write_empty_payload_reports_zero_bytes() {
        let (local, _remote) = tokio::io::duplex(64);
        let mut connection = connection_over(local);
        let observer = Arc::new(RecordingObserver::new());

        StreamWriter::new(observer.clone())
            .write(&mut connection, b"")
            .await
            .unwrap();

        assert!(matches!(
            observer.events().as_slice(),
            [CoreEvent::WriteCompleted { bytes: 0, .. }]
        ));
    }
}
