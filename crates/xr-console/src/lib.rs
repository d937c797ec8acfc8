//! xr-console: prompt-driven session automation for IOS XR consoles
//!
//! This crate automates multi-step dialogues with a Cisco IOS XR device
//! over its reverse-telnet console: logging in, provisioning the
//! root-system user on first boot, generating crypto keys, entering and
//! leaving configuration mode, and capturing the uncommitted
//! configuration diff.
//!
//! The console is a raw byte stream with no command framing, so the
//! crate is built around three small layers:
//!
//! - a [`StreamBuffer`] that retains bounded output history and
//!   recovers the trailing line,
//! - a pure prompt classifier ([`classify`]) that maps that line to a
//!   [`PromptKind`] through an ordered rule list,
//! - a pure state machine ([`transition`]) that folds classified
//!   prompts into the [`SessionState`].
//!
//! On top of those, [`Script`]s describe each dialogue declaratively
//! and the [`DialogueEngine`] runs them: drain, classify, transition,
//! act, bounded by a retry budget and a hard cycle cap. Prompt-level
//! trouble is reported in a [`DialogueReport`], never panicked or
//! retried blindly; only transport failures surface as errors.
//!
//! # Example
//!
//! ```ignore
//! use xr_console::{ConsoleConfig, Credentials, Session};
//!
//! #[tokio::main]
//! async fn main() -> xr_console::Result<()> {
//!     let config = ConsoleConfig::new();
//!     let credentials = Credentials::new("admin", "admin123");
//!     let mut session = Session::connect("10.0.0.1", 2023, config, credentials).await?;
//!
//!     let login = session.login().await?;
//!     assert!(login.is_success());
//!
//!     session.enter_config(false).await?;
//!     let diff = session.show_config_diff().await?;
//!     println!("{}", diff.captured);
//!     session.exit_config().await?;
//!     session.close().await
//! }
//! ```

pub mod buffer;
pub mod config;
pub mod dialog;
pub mod error;
pub mod prompt;
pub mod session;
pub mod state;
pub mod transport;
pub mod types;

/// Scripted in-memory transport for testing.
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use buffer::StreamBuffer;
pub use config::ConsoleConfig;
pub use dialog::{
    DialogueEngine, DialogueReport, RetryBudget, Script, ScriptKind, Step, StepAction,
};
pub use error::{ConsoleError, Result};
pub use prompt::{PromptKind, classify};
pub use session::Session;
pub use state::{SessionState, transition};
pub use types::{Credentials, FailureReason, Outcome};

#[cfg(any(test, feature = "mock"))]
pub use mock::MockTransport;
