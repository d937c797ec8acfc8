//! Console sessions and their caller-facing operations.
//!
//! A [`Session`] owns one transport, the stream buffer, the credential
//! pair, and the authoritative [`SessionState`]. Dialogues are run one
//! at a time through `&mut self`, which makes the single-in-flight rule
//! a compile-time guarantee rather than a convention. Writes are
//! fire-and-forget: the next classified prompt is the de facto
//! acknowledgement.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::config::ConsoleConfig;
use crate::dialog::{DialogueEngine, DialogueReport, Script};
use crate::error::{ConsoleError, Result};
use crate::prompt::{self, PromptKind};
use crate::state::{self, SessionState};
use crate::transport;
use crate::types::{Credentials, Outcome};

/// One prompt-driven console session.
pub struct Session<T> {
    transport: T,
    state: SessionState,
    buffer: crate::buffer::StreamBuffer,
    credentials: Credentials,
    config: ConsoleConfig,
    last_kind: PromptKind,
    last_line: String,
}

impl Session<TcpStream> {
    /// Connect to a reverse-telnet console and build a session around
    /// the stream.
    ///
    /// # Errors
    ///
    /// Returns a connect error when the TCP connection cannot be
    /// established within the configured timeout.
    pub async fn connect(
        host: &str,
        port: u16,
        config: ConsoleConfig,
        credentials: Credentials,
    ) -> Result<Self> {
        let stream = transport::connect(host, port, config.connect_timeout).await?;
        Ok(Self::with_transport(stream, config, credentials))
    }
}

impl<T> Session<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Build a session around an already-established transport.
    ///
    /// The session starts `Unauthenticated`: a transport handed to us is
    /// assumed live, and the first dialogue's probing read will discover
    /// the device's actual mode.
    #[must_use]
    pub fn with_transport(transport: T, config: ConsoleConfig, credentials: Credentials) -> Self {
        let buffer = crate::buffer::StreamBuffer::new(config.max_history_chunks);
        Self {
            transport,
            state: SessionState::Unauthenticated,
            buffer,
            credentials,
            config,
            last_kind: PromptKind::Unknown,
            last_line: String::new(),
        }
    }

    /// Current session state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Last classified prompt kind.
    #[must_use]
    pub const fn last_kind(&self) -> PromptKind {
        self.last_kind
    }

    /// Last classified line, trimmed.
    #[must_use]
    pub fn last_line(&self) -> &str {
        &self.last_line
    }

    /// The credential pair this session authenticates with.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The session configuration.
    #[must_use]
    pub const fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Raw transcript of retained console output, for debugging.
    #[must_use]
    pub fn transcript(&self) -> String {
        self.buffer.transcript()
    }

    /// Force the session state. Test hook only: production state flows
    /// exclusively through the transition table.
    #[cfg(any(test, feature = "mock"))]
    pub fn force_state(&mut self, state: SessionState) {
        self.state = state;
    }

    /// Read all currently available output into the buffer.
    ///
    /// Blocks up to the configured read timeout for the first byte, then
    /// keeps vacuuming with the shorter settle delay until the stream
    /// goes quiet. Returns the newly drained text; an empty string means
    /// no signal arrived, which classifies as `Unknown` downstream.
    ///
    /// # Errors
    ///
    /// Returns a transport error if a read fails or the stream reaches
    /// end of file (the connection was dropped or interrupted).
    /// Timeouts are not errors; liveness is owned by the dialogue retry
    /// budget.
    pub async fn drain(&mut self) -> Result<String> {
        let mut drained = String::new();
        let mut chunk = [0u8; 4096];
        let mut wait = self.config.read_timeout;
        loop {
            match tokio::time::timeout(wait, self.transport.read(&mut chunk)).await {
                Err(_elapsed) => break,
                Ok(Ok(0)) => {
                    return Err(ConsoleError::transport(
                        "draining output",
                        std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            "console stream closed",
                        ),
                    ));
                }
                Ok(Ok(n)) => {
                    let text = String::from_utf8_lossy(&chunk[..n]);
                    trace!(bytes = n, "drained chunk");
                    drained.push_str(&text);
                    self.buffer.append_text(text.into_owned());
                    wait = self.config.settle_delay;
                }
                Ok(Err(e)) => return Err(ConsoleError::transport("draining output", e)),
            }
        }
        Ok(drained)
    }

    /// Classify the current trailing line without touching state.
    #[must_use]
    pub fn classify_current(&self) -> (PromptKind, String) {
        let line = self.buffer.last_line().unwrap_or_default().to_string();
        (prompt::classify(&line), line)
    }

    /// Record a classification: advance the state machine and remember
    /// the line. The single writer of `state` outside teardown.
    pub(crate) fn observe(&mut self, kind: PromptKind, line: &str) {
        let next = state::transition(self.state, kind);
        if next != self.state {
            debug!(from = %self.state, to = %next, prompt = %kind, "state transition");
        }
        self.state = next;
        self.last_kind = kind;
        self.last_line.clear();
        self.last_line.push_str(line);
    }

    /// Drain once and fold the classification into the state machine.
    /// Zero writes; used as the probing read before dialogues.
    pub(crate) async fn refresh_state(&mut self) -> Result<()> {
        self.drain().await?;
        let (kind, line) = self.classify_current();
        self.observe(kind, &line);
        Ok(())
    }

    /// Write one line, appending the configured line ending.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the write fails.
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        trace!(len = line.len(), "sending line");
        self.transport
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ConsoleError::transport("writing line", e))?;
        self.transport
            .write_all(self.config.line_ending.as_bytes())
            .await
            .map_err(|e| ConsoleError::transport("writing line ending", e))?;
        self.transport
            .flush()
            .await
            .map_err(|e| ConsoleError::transport("flushing write", e))
    }

    /// Send a bare carriage return to provoke the device into
    /// re-displaying its current prompt.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the write fails.
    pub async fn nudge(&mut self) -> Result<()> {
        self.transport
            .write_all(b"\r\n")
            .await
            .map_err(|e| ConsoleError::transport("nudging", e))?;
        self.transport
            .flush()
            .await
            .map_err(|e| ConsoleError::transport("flushing nudge", e))
    }

    /// Check the transport is still accepting writes by sending telnet
    /// `IAC NOP` probes. `false` means the connection is gone.
    pub async fn check_alive(&mut self) -> bool {
        if !self.state.is_connected() {
            return false;
        }
        for _ in 0..transport::NOP_PROBES {
            if self
                .transport
                .write_all(&[transport::IAC, transport::NOP])
                .await
                .is_err()
            {
                return false;
            }
        }
        self.transport.flush().await.is_ok()
    }

    /// Run one dialogue script to completion.
    ///
    /// # Errors
    ///
    /// Returns an error only for transport failures; prompt-level
    /// conditions are reported in the [`DialogueReport`].
    pub async fn run_script(&mut self, script: &Script) -> Result<DialogueReport> {
        if !self.state.is_connected() {
            return Err(ConsoleError::Closed);
        }
        let engine = DialogueEngine::new(self.config.retry_budget, self.config.max_cycles);
        engine.run(self, script).await
    }

    /// Authenticate with the session credentials.
    ///
    /// Short-circuits to `AlreadyInTargetState` when an existing login
    /// session is detected, with zero writes performed.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures.
    pub async fn login(&mut self) -> Result<DialogueReport> {
        self.run_script(&Script::login()).await
    }

    /// Provision the root-system user on a freshly booted device.
    ///
    /// Runs the login dialogue first: a usable login means the root user
    /// already exists (`AlreadyInTargetState`); a login timeout on the
    /// first-boot provisioning prompt falls through to the creation
    /// dialogue.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures.
    pub async fn create_root_user(&mut self) -> Result<DialogueReport> {
        let login = self.login().await?;
        match login.outcome {
            Outcome::Succeeded | Outcome::AlreadyInTargetState => {
                debug!("root-system user already provisioned");
                let mut report = login;
                report.outcome = Outcome::AlreadyInTargetState;
                report.script = crate::dialog::ScriptKind::CreateRootUser;
                Ok(report)
            }
            Outcome::Failed(_) => {
                let mut report = login;
                report.script = crate::dialog::ScriptKind::CreateRootUser;
                Ok(report)
            }
            Outcome::TimedOut => self.run_script(&Script::create_root_user()).await,
        }
    }

    /// Generate the default RSA key pair; `overwrite` answers any
    /// replace-existing-keys confirmation deterministically.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures.
    pub async fn generate_crypto_keys(&mut self, overwrite: bool) -> Result<DialogueReport> {
        self.run_script(&Script::generate_crypto_keys(overwrite)).await
    }

    /// Enter configuration mode (`configure exclusive` when asked).
    /// Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures.
    pub async fn enter_config(&mut self, exclusive: bool) -> Result<DialogueReport> {
        self.run_script(&Script::enter_config(exclusive)).await
    }

    /// Leave configuration mode, declining a pending-commit cue if the
    /// device raises one.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures.
    pub async fn exit_config(&mut self) -> Result<DialogueReport> {
        self.run_script(&Script::exit_config()).await
    }

    /// Capture the uncommitted configuration diff.
    ///
    /// Read-only; requires configuration mode. The captured text (raw,
    /// trailing prompt included) is in the report's `captured` field;
    /// semantic inspection of it is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures.
    pub async fn show_config_diff(&mut self) -> Result<DialogueReport> {
        self.run_script(&Script::show_diff()).await
    }

    /// Log out of the device. The reverse-telnet connection stays up and
    /// returns to the authentication prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the logout write fails.
    pub async fn logout(&mut self) -> Result<()> {
        self.transport
            .write_all(b"end\n\nexit\n\n")
            .await
            .map_err(|e| ConsoleError::transport("logging out", e))?;
        self.transport
            .flush()
            .await
            .map_err(|e| ConsoleError::transport("flushing logout", e))?;
        // Stale prompts must not classify as an existing session.
        self.buffer.clear();
        self.last_kind = PromptKind::Unknown;
        self.last_line.clear();
        self.state = SessionState::Unauthenticated;
        Ok(())
    }

    /// Tear the session down. The only path to `Disconnected`.
    ///
    /// # Errors
    ///
    /// Returns an error if shutting the transport down fails; the
    /// session is marked disconnected either way.
    pub async fn close(&mut self) -> Result<()> {
        self.state = SessionState::Disconnected;
        self.transport
            .shutdown()
            .await
            .map_err(|e| ConsoleError::transport("closing transport", e))
    }
}

impl<T> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("last_kind", &self.last_kind)
            .field("last_line", &self.last_line)
            .field("username", &self.credentials.username)
            .finish_non_exhaustive()
    }
}
