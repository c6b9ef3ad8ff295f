//! Adapter for transport stacks whose connect call blocks.
//!
//! Many radio stacks expose a synchronous `connect()` that can take seconds.
//! [`BlockingTransportAdapter`] runs it on tokio's blocking pool via
//! `spawn_blocking`, so the connection engine's task keeps yielding while the
//! radio negotiates.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use peerlink_core::{PeerAddress, Strategy};
use tracing::debug;

use crate::application::ports::{BoxedStream, StreamHandle, TransportFactory};

/// A transport whose connect call blocks the calling thread.
pub trait BlockingConnector: Send + Sync + 'static {
    /// The async stream handed back once connected.
    type Stream: StreamHandle + 'static;

    /// Opens a connection, blocking until the radio succeeds or gives up.
    ///
    /// # Errors
    ///
    /// Returns the stack's I/O error when the attempt fails.
    fn connect_blocking(&self, target: &PeerAddress, strategy: &Strategy) -> io::Result<Self::Stream>;
}

pub struct BlockingTransportAdapter<C> {
    connector: Arc<C>,
}

impl<C: BlockingConnector> BlockingTransportAdapter<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector: Arc::new(connector),
        }
    }
}

#[async_trait]
impl<C: BlockingConnector> TransportFactory for BlockingTransportAdapter<C> {
    async fn open_stream(&self, target: &PeerAddress, strategy: &Strategy) -> io::Result<BoxedStream> {
        let connector = Arc::clone(&self.connector);
        let target = target.clone();
        let strategy = *strategy;

        debug!("connecting to {target} with {strategy} on the blocking pool");
        let stream = tokio::task::spawn_blocking(move || connector.connect_blocking(&target, &strategy))
            .await
            .map_err(io::Error::other)??;
        Ok(Box::new(stream))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
