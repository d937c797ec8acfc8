//! Error types for xr-console.
//!
//! Only transport trouble is an error here. Prompt-level conditions
//! (classification timeout, unexpected prompt, already-in-target-state)
//! are dialogue [`Outcome`](crate::Outcome)s: they are absorbed by the
//! bounded retry loop and reported in the [`DialogueReport`], not raised.
//!
//! [`DialogueReport`]: crate::DialogueReport

use std::io;
use std::time::Duration;

use thiserror::Error;

/// The main error type for console operations.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Failed to establish the TCP connection to the console server.
    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        /// The host that could not be reached.
        host: String,
        /// The console port that was dialed.
        port: u16,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Connection attempt did not complete within the allowed time.
    #[error("connection to {host}:{port} timed out after {timeout:?}")]
    ConnectTimeout {
        /// The host that did not answer.
        host: String,
        /// The console port that was dialed.
        port: u16,
        /// The connect timeout that elapsed.
        timeout: Duration,
    },

    /// An I/O error occurred on an established transport.
    #[error("transport error while {context}: {source}")]
    Transport {
        /// What the session was doing when the transport failed.
        context: &'static str,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The session has been closed; no further dialogues may run on it.
    #[error("session is closed")]
    Closed,
}

impl ConsoleError {
    /// Create a connect error.
    pub fn connect(host: impl Into<String>, port: u16, source: io::Error) -> Self {
        Self::Connect {
            host: host.into(),
            port,
            source,
        }
    }

    /// Create a connect-timeout error.
    pub fn connect_timeout(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self::ConnectTimeout {
            host: host.into(),
            port,
            timeout,
        }
    }

    /// Create a transport error with context about the failed operation.
    #[must_use]
    pub const fn transport(context: &'static str, source: io::Error) -> Self {
        Self::Transport { context, source }
    }

    /// Check if this error is fatal to the session.
    ///
    /// All current variants are; the method exists so callers do not have
    /// to match exhaustively.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::ConnectTimeout { .. } | Self::Transport { .. } | Self::Closed
        )
    }

    /// Check if this is a transport error on an established connection.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Result type alias for console operations.
pub type Result<T> = std::result::Result<T, ConsoleError>;
