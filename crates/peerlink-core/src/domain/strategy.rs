//! Connection strategies and per-attempt bookkeeping.
//!
//! A [`Strategy`] names one way of opening a stream to a peer: a
//! [`NegotiationMode`] (whether the link is authenticated) plus the service
//! id the peer is expected to expose.  The service id is opaque to peerlink;
//! it is handed through to the transport unchanged.
//!
//! The connection engine records one [`ConnectionAttempt`] per strategy it
//! tries, in order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Serial Port Profile service id, the common default for stream-oriented
/// short-range links.
pub const SERIAL_PORT_SERVICE_ID: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805f9b34fb);

/// How the link to the peer is negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationMode {
    /// No pairing or link-key authentication is requested.
    Unauthenticated,
    /// The link must be authenticated (and encrypted) before use.
    Authenticated,
}

impl NegotiationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            NegotiationMode::Unauthenticated => "unauthenticated",
            NegotiationMode::Authenticated => "authenticated",
        }
    }
}

impl fmt::Display for NegotiationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown negotiation mode name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown negotiation mode {0:?}; expected \"unauthenticated\" or \"authenticated\"")]
pub struct UnknownModeError(pub String);

impl FromStr for NegotiationMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unauthenticated" | "insecure" => Ok(NegotiationMode::Unauthenticated),
            "authenticated" | "secure" => Ok(NegotiationMode::Authenticated),
            _ => Err(UnknownModeError(s.to_string())),
        }
    }
}

/// One negotiation mode applied to one service id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Strategy {
    pub mode: NegotiationMode,
    pub service_id: Uuid,
}

impl Strategy {
    pub fn unauthenticated(service_id: Uuid) -> Self {
        Self {
            mode: NegotiationMode::Unauthenticated,
            service_id,
        }
    }

    pub fn authenticated(service_id: Uuid) -> Self {
        Self {
            mode: NegotiationMode::Authenticated,
            service_id,
        }
    }

    /// Unauthenticated first, authenticated as the fallback, both on the
    /// Serial Port Profile.
    pub fn default_sequence() -> Vec<Strategy> {
        vec![
            Strategy::unauthenticated(SERIAL_PORT_SERVICE_ID),
            Strategy::authenticated(SERIAL_PORT_SERVICE_ID),
        ]
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.mode, self.service_id)
    }
}

/// Result of trying a single strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failed { reason: String },
}

/// Record of one strategy trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionAttempt {
    pub strategy: Strategy,
    pub outcome: AttemptOutcome,
}

impl ConnectionAttempt {
    pub fn succeeded(strategy: Strategy) -> Self {
        Self {
            strategy,
            outcome: AttemptOutcome::Success,
        }
    }

    pub fn failed(strategy: Strategy, reason: impl Into<String>) -> Self {
        Self {
            strategy,
            outcome: AttemptOutcome::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == AttemptOutcome::Success
    }

    /// The failure reason, if this attempt failed.
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.outcome {
            AttemptOutcome::Failed { reason } => Some(reason),
            AttemptOutcome::Success => None,
        }
    }
}

impl fmt::Display for ConnectionAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            AttemptOutcome::Success => write!(f, "{}: ok", self.strategy),
            AttemptOutcome::Failed { reason } => write!(f, "{}: {reason}", self.strategy),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
