//! Common types for xr-console.
//!
//! Defines the credential pair a session authenticates with and the
//! terminal outcome vocabulary shared by every dialogue script.

use std::fmt;

use crate::prompt::PromptKind;
use crate::state::SessionState;

/// Username and secret used by the login and root-user dialogues.
///
/// Held in memory for the lifetime of one session; this crate does not
/// persist or format credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Login / root-system username.
    pub username: String,
    /// Login password, also used as the root-system secret.
    pub secret: String,
}

impl Credentials {
    /// Create a new credential pair.
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }
}

/// Terminal outcome of a dialogue script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The script ran to completion and changed device or session state.
    Succeeded,

    /// The session was already in the script's end state; zero writes
    /// were performed beyond the probing read.
    AlreadyInTargetState,

    /// A recognized prompt arrived that is inconsistent with forward
    /// progress. Not retried automatically.
    Failed(FailureReason),

    /// No classifiable signal within the retry budget. No destructive
    /// action was taken, so the whole dialogue is safe to retry.
    TimedOut,
}

impl Outcome {
    /// Check if the dialogue reached its goal (including idempotent no-ops).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded | Self::AlreadyInTargetState)
    }

    /// Check if the dialogue timed out without a classifiable signal.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    /// Get the failure reason, if the dialogue failed.
    #[must_use]
    pub const fn failure(&self) -> Option<&FailureReason> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::AlreadyInTargetState => write!(f, "already in target state"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Why a dialogue reported [`Outcome::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The device re-issued a credential prompt after credentials were
    /// already submitted. Blind retry risks account lockout, so this is
    /// surfaced instead of retried.
    CredentialsRejected,

    /// The session was not in the state the script requires to start.
    PreconditionNotMet {
        /// The state the script requires.
        required: SessionState,
    },

    /// A recognized prompt arrived that the script cannot reconcile with
    /// its progress so far.
    UnexpectedPrompt {
        /// The prompt kind that was observed.
        kind: PromptKind,
    },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CredentialsRejected => write!(f, "credentials rejected by device"),
            Self::PreconditionNotMet { required } => {
                write!(f, "session must be in state {required} to run this dialogue")
            }
            Self::UnexpectedPrompt { kind } => {
                write!(f, "unexpected prompt: {kind}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_predicates() {
        assert!(Outcome::Succeeded.is_success());
        assert!(Outcome::AlreadyInTargetState.is_success());
        assert!(!Outcome::TimedOut.is_success());
        assert!(Outcome::TimedOut.is_timeout());

        let failed = Outcome::Failed(FailureReason::CredentialsRejected);
        assert!(!failed.is_success());
        assert_eq!(failed.failure(), Some(&FailureReason::CredentialsRejected));
        assert_eq!(Outcome::Succeeded.failure(), None);
    }

    #[test]
    fn outcome_display() {
        let failed = Outcome::Failed(FailureReason::PreconditionNotMet {
            required: SessionState::Authenticated,
        });
        let msg = failed.to_string();
        assert!(msg.contains("failed"));
        assert!(msg.contains("authenticated"));
    }

    #[test]
    fn credentials_construction() {
        let creds = Credentials::new("root", "lab123");
        assert_eq!(creds.username, "root");
        assert_eq!(creds.secret, "lab123");
    }
}
