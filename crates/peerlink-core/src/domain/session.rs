//! ScanSession: the lifecycle of one bounded discovery attempt.
//!
//! ```text
//! Idle ──► Active ──► Completed
//!   │        │
//!   └────────┴──────► Failed
//! ```
//!
//! - `Idle`: created, the platform scan has not started yet.
//! - `Active`: the platform scan is running; sightings are accepted.
//! - `Completed`: the deadline elapsed or a stop was requested.
//! - `Failed`: the scan could not start or the platform aborted it.
//!
//! `Completed` and `Failed` are terminal.  Every transition out of a terminal
//! state is rejected with [`TransitionError`], which is what lets the
//! discovery controller report completion exactly once when the deadline
//! and an explicit stop race each other.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// State of a [`ScanSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    Active,
    Completed,
    Failed,
}

impl ScanState {
    /// Returns `true` for `Completed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, ScanState::Completed | ScanState::Failed)
    }
}

/// Why an Active session moved to `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// The configured scan duration elapsed.
    DeadlineElapsed,
    /// The caller asked for the scan to stop early.
    StopRequested,
}

/// Longest scan a session will honour.  Longer requests are clamped so the
/// deadline arithmetic cannot overflow.
pub const MAX_SCAN_DURATION: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Rejected state transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("scan session cannot move from {from:?} to {to:?}")]
pub struct TransitionError {
    pub from: ScanState,
    pub to: ScanState,
}

/// One bounded discovery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSession {
    id: Uuid,
    state: ScanState,
    started_at: SystemTime,
    deadline: SystemTime,
    error_reason: Option<String>,
    completion: Option<CompletionReason>,
}

impl ScanSession {
    /// Creates an `Idle` session whose deadline is `now + duration`.
    ///
    /// `duration` is clamped to [`MAX_SCAN_DURATION`].  If even that does not
    /// fit after `now`, the deadline saturates at `now`.
    pub fn new(duration: Duration, now: SystemTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: ScanState::Idle,
            started_at: now,
            deadline: now
                .checked_add(duration.min(MAX_SCAN_DURATION))
                .unwrap_or(now),
            error_reason: None,
            completion: None,
        }
    }

    /// `Idle -> Active`.
    pub fn activate(&mut self) -> Result<(), TransitionError> {
        self.transition(ScanState::Idle, ScanState::Active)
    }

    /// `Active -> Completed`.
    pub fn complete(&mut self, reason: CompletionReason) -> Result<(), TransitionError> {
        self.transition(ScanState::Active, ScanState::Completed)?;
        self.completion = Some(reason);
        Ok(())
    }

    /// `Idle | Active -> Failed`, recording `reason`.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        if self.state.is_terminal() {
            return Err(TransitionError {
                from: self.state,
                to: ScanState::Failed,
            });
        }
        self.state = ScanState::Failed;
        self.error_reason = Some(reason.into());
        Ok(())
    }

    fn transition(&mut self, expected: ScanState, to: ScanState) -> Result<(), TransitionError> {
        if self.state != expected {
            return Err(TransitionError {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Sightings are only accepted while the session is `Active`.
    pub fn accepts_sightings(&self) -> bool {
        self.state == ScanState::Active
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    pub fn deadline(&self) -> SystemTime {
        self.deadline
    }

    /// Configured scan duration.
    pub fn duration(&self) -> Duration {
        self.deadline
            .duration_since(self.started_at)
            .unwrap_or_default()
    }

    /// Populated only in `Failed`.
    pub fn error_reason(&self) -> Option<&str> {
        self.error_reason.as_deref()
    }

    /// Populated only in `Completed`.
    pub fn completion(&self) -> Option<CompletionReason> {
        self.completion
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_session() -> ScanSession {
        ScanSession::new(Duration::from_secs(10), SystemTime::UNIX_EPOCH)
    }

    #[test]
    fn test_new_session_is_idle_with_deadline() {
        // Arrange / Act
        let session = idle_session();

        // Assert
        assert_eq!(session.state(), ScanState::Idle);
        assert_eq!(
            session.deadline(),
            SystemTime::UNIX_EPOCH + Duration::from_secs(10)
        );
        assert_eq!(session.duration(), Duration::from_secs(10));
        assert!(!session.accepts_sightings());
    }

    #[test]
    fn test_huge_duration_is_clamped_instead_of_overflowing() {
        // Arrange / Act
        let session = ScanSession::new(Duration::MAX, SystemTime::UNIX_EPOCH);

        // Assert
        assert_eq!(session.duration(), MAX_SCAN_DURATION);
        assert_eq!(
            session.deadline(),
            SystemTime::UNIX_EPOCH + MAX_SCAN_DURATION
        );
    }

    #[test]
    fn test_activate_then_complete() {
        let mut session = idle_session();

        session.activate().unwrap();
        assert!(session.accepts_sightings());

        session.complete(CompletionReason::DeadlineElapsed).unwrap();
        assert_eq!(session.state(), ScanState::Completed);
        assert_eq!(session.completion(), Some(CompletionReason::DeadlineElapsed));
        assert!(session.error_reason().is_none());
    }

    #[test]
    fn test_second_completion_is_rejected() {
        // Arrange
        let mut session = idle_session();
        session.activate().unwrap();
        session.complete(CompletionReason::StopRequested).unwrap();

        // Act
        let second = session.complete(CompletionReason::DeadlineElapsed);

        // Assert: first completion wins
        assert_eq!(
            second,
            Err(TransitionError {
                from: ScanState::Completed,
                to: ScanState::Completed,
            })
        );
        assert_eq!(session.completion(), Some(CompletionReason::StopRequested));
    }

    #[test]
    fn test_fail_from_idle_records_reason() {
        let mut session = idle_session();

        session.fail("permission denied").unwrap();

        assert_eq!(session.state(), ScanState::Failed);
        assert_eq!(session.error_reason(), Some("permission denied"));
    }

    #[test]
    fn test_fail_after_completion_is_rejected() {
        let mut session = idle_session();
        session.activate().unwrap();
        session.complete(CompletionReason::DeadlineElapsed).unwrap();

        assert!(session.fail("late error").is_err());
        assert_eq!(session.state(), ScanState::Completed);
        assert!(session.error_reason().is_none());
    }

    #[test]
    fn test_complete_from_idle_is_rejected() {
        let mut session = idle_session();
        assert!(session.complete(CompletionReason::StopRequested).is_err());
        assert_eq!(session.state(), ScanState::Idle);
    }

    #[test]
    fn test_terminal_states() {
        assert!(ScanState::Completed.is_terminal());
        assert!(ScanState::Failed.is_terminal());
        assert!(!ScanState::Idle.is_terminal());
        assert!(!ScanState::Active.is_terminal());
    }
}
