//! Session state machine.
//!
//! [`SessionState`] is the authoritative mode of one console session;
//! [`transition`] is the pure table that advances it from classified
//! prompts. Unmapped `(state, kind)` pairs are deliberate no-ops: the
//! dialogue engine, not the table, decides whether an unchanged state
//! means success, failure, or "already there". The machine has no
//! terminal state, since authentication and config mode are reversible,
//! recurring conditions on a real device. `Disconnected` is only
//! reachable through explicit teardown, never through a prompt.

use std::fmt;

use crate::prompt::PromptKind;

/// The mode a console session is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No transport, or the session was explicitly closed.
    Disconnected,

    /// Connected, no authentication progress observed yet.
    Unauthenticated,

    /// The device asked for a username.
    AwaitingUsername,

    /// The device asked for a password.
    AwaitingPassword,

    /// An operational prompt was observed; the session can run exec
    /// commands.
    Authenticated,

    /// The root-user provisioning dialogue asked for the secret.
    AwaitingSecret,

    /// The provisioning dialogue asked for the secret confirmation.
    AwaitingSecretConfirm,

    /// A configuration-mode prompt was observed.
    ConfigMode,
}

impl SessionState {
    /// Check if the session is past authentication (operational or
    /// configuration mode).
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated | Self::ConfigMode)
    }

    /// Check if the session is usable at all.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        !matches!(self, Self::Disconnected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Unauthenticated => "unauthenticated",
            Self::AwaitingUsername => "awaiting username",
            Self::AwaitingPassword => "awaiting password",
            Self::Authenticated => "authenticated",
            Self::AwaitingSecret => "awaiting secret",
            Self::AwaitingSecretConfirm => "awaiting secret confirmation",
            Self::ConfigMode => "config mode",
        };
        write!(f, "{s}")
    }
}

/// The transition table. Pairs not listed leave the state unchanged.
const TRANSITIONS: &[(SessionState, PromptKind, SessionState)] = {
    use PromptKind as K;
    use SessionState as S;
    &[
        // Authentication round-trip.
        (S::Unauthenticated, K::Username, S::AwaitingUsername),
        (S::Unauthenticated, K::Password, S::AwaitingPassword),
        (S::AwaitingUsername, K::Password, S::AwaitingPassword),
        (S::AwaitingPassword, K::Operational, S::Authenticated),
        (S::AwaitingUsername, K::Operational, S::Authenticated),
        // A rejected login loops back to the username prompt.
        (S::AwaitingPassword, K::Username, S::AwaitingUsername),
        // Existing session detected on first contact.
        (S::Unauthenticated, K::Operational, S::Authenticated),
        (S::Unauthenticated, K::OperationalConfig, S::ConfigMode),
        // Config mode entry and exit.
        (S::Authenticated, K::OperationalConfig, S::ConfigMode),
        (S::ConfigMode, K::Operational, S::Authenticated),
        // The device fell back to its authentication prompt.
        (S::Authenticated, K::Username, S::AwaitingUsername),
        // Root-user provisioning sub-dialogue.
        (S::Unauthenticated, K::Secret, S::AwaitingSecret),
        (S::AwaitingUsername, K::Secret, S::AwaitingSecret),
        (S::Authenticated, K::Secret, S::AwaitingSecret),
        (S::AwaitingSecret, K::SecretConfirm, S::AwaitingSecretConfirm),
        (S::AwaitingSecretConfirm, K::Username, S::AwaitingUsername),
    ]
};

/// Advance `current` by one classified prompt.
///
/// Pure and total: unmapped pairs return `current` unchanged, and no
/// prompt ever yields `Disconnected`.
#[must_use]
pub fn transition(current: SessionState, kind: PromptKind) -> SessionState {
    TRANSITIONS
        .iter()
        .find(|(state, k, _)| *state == current && *k == kind)
        .map_or(current, |(_, _, next)| *next)
}
