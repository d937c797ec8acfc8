//! Dialogue execution engine.
//!
//! One loop runs every script: drain the transport, classify the
//! trailing line, advance the session state, then let the first eligible
//! script step act. Unmatched prompts cost retry budget and optionally
//! provoke a nudge; matched prompts cost nothing but are capped by a
//! hard cycle bound so a chattering device can never spin the engine
//! forever.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use super::definition::{RetryBudget, Script, ScriptKind, StepAction};
use crate::error::Result;
use crate::prompt::PromptKind;
use crate::session::Session;
use crate::state::SessionState;
use crate::types::{FailureReason, Outcome};

/// Structured result of one dialogue run.
///
/// Carries enough context to diagnose a failure without the raw
/// transcript: the outcome, the states the session moved between, the
/// last classified prompt, and how much retry budget was burned.
#[derive(Debug, Clone)]
pub struct DialogueReport {
    /// Which script ran.
    pub script: ScriptKind,

    /// Terminal outcome.
    pub outcome: Outcome,

    /// Session state when the run started.
    pub state_before: SessionState,

    /// Session state when the run ended.
    pub state_after: SessionState,

    /// Last classified prompt kind.
    pub last_kind: PromptKind,

    /// Last classified line, verbatim (trimmed).
    pub last_line: String,

    /// Unmatched cycles spent from the retry budget.
    pub retries_used: u32,

    /// Text captured after the command send, for capturing scripts
    /// (show-diff); empty otherwise.
    pub captured: String,
}

impl DialogueReport {
    /// Check if the dialogue reached its goal.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Runs dialogue scripts against a session.
#[derive(Debug, Clone, Copy)]
pub struct DialogueEngine {
    /// Unmatched cycles tolerated per run.
    pub retry_budget: u32,

    /// Hard bound on total cycles per run, unless the script carries its
    /// own.
    pub max_cycles: u32,
}

impl DialogueEngine {
    /// Create an engine with the given bounds.
    #[must_use]
    pub const fn new(retry_budget: u32, max_cycles: u32) -> Self {
        Self {
            retry_budget,
            max_cycles,
        }
    }

    /// Run `script` on `session` until it terminates or a bound expires.
    ///
    /// # Errors
    ///
    /// Returns an error only for transport failures, which are fatal to
    /// the session. Every prompt-level condition is absorbed into the
    /// returned report's [`Outcome`].
    pub async fn run<T>(&self, session: &mut Session<T>, script: &Script) -> Result<DialogueReport>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let state_before = session.state();
        debug!(script = script.kind.name(), %state_before, "starting dialogue");

        // Precondition: one probing drain may refresh a stale state, but
        // an unmet requirement is a failure, not a retry loop.
        if let Some(required) = script.requires {
            if session.state() != required {
                session.refresh_state().await?;
            }
            let met = match required {
                // Config mode satisfies an authentication requirement.
                SessionState::Authenticated => session.state().is_authenticated(),
                other => session.state() == other,
            };
            if !met {
                return Ok(self.report(
                    session,
                    script,
                    state_before,
                    Outcome::Failed(FailureReason::PreconditionNotMet { required }),
                    0,
                    String::new(),
                ));
            }
        }

        // Idempotent short-circuit: never re-submit a state-changing
        // write when the session is already where the script ends.
        if let Some(target) = script.target {
            if session.state() == target {
                info!(script = script.kind.name(), "already in target state");
                return Ok(self.report(
                    session,
                    script,
                    state_before,
                    Outcome::AlreadyInTargetState,
                    0,
                    String::new(),
                ));
            }
            session.refresh_state().await?;
            if session.state() == target {
                info!(script = script.kind.name(), "target state detected on probe");
                return Ok(self.report(
                    session,
                    script,
                    state_before,
                    Outcome::AlreadyInTargetState,
                    0,
                    String::new(),
                ));
            }
        }

        let mut budget = RetryBudget::new(self.retry_budget);
        let mut fired = vec![false; script.steps.len()];
        let mut secret_confirmed = false;
        let mut capturing = false;
        let mut captured = String::new();
        // Whether the current classified prompt was already answered by
        // a step in this run. An answered prompt is not signal: steps
        // only fire (and `fail_on_repeat` only trips) on output the
        // device actually produced since the last action.
        let mut answered = false;
        // Classification at the moment of the last nudge, for telling a
        // provoked re-display apart from a device-initiated prompt.
        let mut nudge_echo: Option<(PromptKind, String)> = None;
        let cycle_bound = script.cycle_bound.unwrap_or(self.max_cycles);

        for _cycle in 0..cycle_bound {
            let drained = session.drain().await?;
            if capturing {
                captured.push_str(&drained);
            }
            let (kind, line) = session.classify_current();
            if !drained.trim().is_empty() {
                session.observe(kind, &line);
                debug!(
                    script = script.kind.name(),
                    prompt = %kind,
                    state = %session.state(),
                    "classified"
                );
                // A nudge makes the device repaint its current prompt;
                // a repaint of an already-answered prompt is not a
                // re-issue.
                let repaint = answered
                    && nudge_echo
                        .as_ref()
                        .is_some_and(|(k, l)| *k == kind && *l == line);
                if !repaint {
                    answered = false;
                }
            }
            nudge_echo = None;

            let mut matched = None;
            if !answered {
                for (idx, step) in script.steps.iter().enumerate() {
                    if !step.accepts(kind, &line) {
                        continue;
                    }
                    if fired[idx] && step.once {
                        if let Some(reason) = &step.fail_on_repeat {
                            // A single-shot prompt came back after we
                            // answered it; the device is telling us the
                            // answer did not take.
                            warn!(
                                script = script.kind.name(),
                                prompt = %kind,
                                "prompt recurred after single-shot step"
                            );
                            return Ok(self.report(
                                session,
                                script,
                                state_before,
                                Outcome::Failed(reason.clone()),
                                budget.spent(),
                                captured,
                            ));
                        }
                        continue;
                    }
                    matched = Some(idx);
                    break;
                }
            }

            let Some(idx) = matched else {
                if script.nudge {
                    warn!(script = script.kind.name(), line = %line, "no actionable prompt, nudging");
                    session.nudge().await?;
                    nudge_echo = Some((kind, line));
                }
                if !budget.spend() {
                    info!(script = script.kind.name(), "retry budget exhausted");
                    return Ok(self.report(
                        session,
                        script,
                        state_before,
                        Outcome::TimedOut,
                        budget.spent(),
                        captured,
                    ));
                }
                continue;
            };

            fired[idx] = true;
            answered = true;
            match &script.steps[idx].action {
                StepAction::SendUsername => {
                    let username = session.credentials().username.clone();
                    session.send_line(&username).await?;
                }
                StepAction::SendSecret => {
                    let secret = session.credentials().secret.clone();
                    session.send_line(&secret).await?;
                }
                StepAction::SendSecretConfirm => {
                    let secret = session.credentials().secret.clone();
                    session.send_line(&secret).await?;
                    secret_confirmed = true;
                }
                StepAction::SendLine(command) => {
                    session.send_line(command).await?;
                    if script.capture_output {
                        capturing = true;
                    }
                }
                StepAction::Answer(yes) => {
                    session.send_line(if *yes { "yes" } else { "no" }).await?;
                }
                StepAction::Succeed => {
                    info!(script = script.kind.name(), state = %session.state(), "dialogue succeeded");
                    return Ok(self.report(
                        session,
                        script,
                        state_before,
                        Outcome::Succeeded,
                        budget.spent(),
                        captured,
                    ));
                }
                StepAction::FinishUserCreate => {
                    let outcome = if secret_confirmed {
                        Outcome::Succeeded
                    } else {
                        Outcome::AlreadyInTargetState
                    };
                    info!(script = script.kind.name(), %outcome, "root-user dialogue finished");
                    return Ok(self.report(
                        session,
                        script,
                        state_before,
                        outcome,
                        budget.spent(),
                        captured,
                    ));
                }
            }
        }

        info!(script = script.kind.name(), bound = cycle_bound, "cycle bound reached");
        Ok(self.report(
            session,
            script,
            state_before,
            Outcome::TimedOut,
            budget.spent(),
            captured,
        ))
    }

    #[allow(clippy::unused_self)]
    fn report<T>(
        &self,
        session: &Session<T>,
        script: &Script,
        state_before: SessionState,
        outcome: Outcome,
        retries_used: u32,
        captured: String,
    ) -> DialogueReport
    where
        T: AsyncRead + AsyncWrite + Unpin + Send,
    {
        DialogueReport {
            script: script.kind,
            outcome,
            state_before,
            state_after: session.state(),
            last_kind: session.last_kind(),
            last_line: session.last_line().to_string(),
            retries_used,
            captured,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::ConsoleConfig;
    use crate::mock::MockTransport;
    use crate::types::Credentials;

    const OPER_PROMPT: &str = "\r\nRP/0/0/CPU0:ios#";
    const CONFIG_PROMPT: &str = "\r\nRP/0/0/CPU0:ios(config)#";

    fn test_config() -> ConsoleConfig {
        ConsoleConfig::new()
            .read_timeout(Duration::from_millis(20))
            .settle_delay(Duration::from_millis(5))
            .retry_budget(3)
    }

    fn test_session(transport: MockTransport) -> Session<MockTransport> {
        Session::with_transport(
            transport,
            test_config(),
            Credentials::new("admin", "lab123"),
        )
    }

    #[tokio::test]
    async fn successful_login() {
        let transport = MockTransport::new();
        transport.queue_output_str("Username: ");
        transport.respond_with("Password: ");
        transport.respond_with(OPER_PROMPT);

        let mut session = test_session(transport.clone());
        let report = session.login().await.unwrap();

        assert_eq!(report.outcome, Outcome::Succeeded);
        assert_eq!(report.state_after, SessionState::Authenticated);
        assert_eq!(transport.take_input_str(), "admin\nlab123\n");
    }

    #[tokio::test]
    async fn login_short_circuits_when_already_authenticated() {
        let transport = MockTransport::new();
        transport.queue_output_str(OPER_PROMPT);

        let mut session = test_session(transport.clone());
        let report = session.login().await.unwrap();

        assert_eq!(report.outcome, Outcome::AlreadyInTargetState);
        // Zero writes: the probe alone detected the existing session.
        assert!(transport.take_input().is_empty());
    }

    #[tokio::test]
    async fn login_rejection_is_failed_not_retried() {
        let transport = MockTransport::new();
        transport.queue_output_str("Username: ");
        transport.respond_with("Password: ");
        // Device rejects the password and asks again.
        transport.respond_with("\r\n% Authentication failed\r\nPassword: ");

        let mut session = test_session(transport.clone());
        let report = session.login().await.unwrap();

        assert_eq!(
            report.outcome,
            Outcome::Failed(FailureReason::CredentialsRejected)
        );
        // The secret was written exactly once.
        let input = transport.take_input_str();
        assert_eq!(input.matches("lab123").count(), 1);
    }

    #[tokio::test]
    async fn slow_authentication_times_out_instead_of_failing() {
        let transport = MockTransport::new();
        transport.queue_output_str("Username: ");
        transport.respond_with("Password: ");
        // The device goes silent after the secret is written (slow
        // remote authentication). The buffered password prompt must not
        // be re-read as a rejection.
        let mut session = test_session(transport.clone());
        let report = session.login().await.unwrap();

        assert_eq!(report.outcome, Outcome::TimedOut);
        let input = transport.take_input_str();
        assert_eq!(input.matches("lab123").count(), 1);
    }

    #[tokio::test]
    async fn login_times_out_on_silent_device() {
        let transport = MockTransport::new();
        let mut session = test_session(transport);
        let report = session.login().await.unwrap();

        assert_eq!(report.outcome, Outcome::TimedOut);
        assert_eq!(report.retries_used, 3);
    }

    #[tokio::test]
    async fn crypto_keygen_declines_overwrite() {
        let transport = MockTransport::new();
        transport.queue_output_str(OPER_PROMPT);
        transport.respond_with(
            "The name for the keys will be: the_default\r\n\
             % You already have keys defined named the_default\r\n\
             % Do you really want to replace them? [yes/no]: ",
        );
        transport.respond_with(OPER_PROMPT);

        let mut session = test_session(transport.clone());
        session.force_state(SessionState::Authenticated);
        let report = session.generate_crypto_keys(false).await.unwrap();

        assert_eq!(report.outcome, Outcome::Succeeded);
        assert_eq!(
            transport.take_input_str(),
            "crypto key generate rsa\nno\n"
        );
    }

    #[tokio::test]
    async fn crypto_keygen_needs_fresh_output_to_succeed() {
        let transport = MockTransport::new();
        transport.queue_output_str(OPER_PROMPT);
        // The command produces no device output at all; success must not
        // be declared from the prompt observed before the command.
        let mut session = test_session(transport.clone());
        session.force_state(SessionState::Authenticated);
        let report = session.generate_crypto_keys(true).await.unwrap();

        assert_eq!(report.outcome, Outcome::TimedOut);
        assert_eq!(report.retries_used, 3);
    }

    #[tokio::test]
    async fn crypto_keygen_requires_authentication() {
        let transport = MockTransport::new();
        let mut session = test_session(transport.clone());
        let report = session.generate_crypto_keys(true).await.unwrap();

        assert_eq!(
            report.outcome,
            Outcome::Failed(FailureReason::PreconditionNotMet {
                required: SessionState::Authenticated
            })
        );
        assert!(transport.take_input().is_empty());
    }

    #[tokio::test]
    async fn enter_config_is_idempotent() {
        let transport = MockTransport::new();
        transport.queue_output_str(OPER_PROMPT);
        transport.respond_with(CONFIG_PROMPT);

        let mut session = test_session(transport.clone());
        session.force_state(SessionState::Authenticated);

        let first = session.enter_config(false).await.unwrap();
        assert_eq!(first.outcome, Outcome::Succeeded);
        assert_eq!(first.state_after, SessionState::ConfigMode);
        assert_eq!(transport.take_input_str(), "configure terminal\n");

        let second = session.enter_config(false).await.unwrap();
        assert_eq!(second.outcome, Outcome::AlreadyInTargetState);
        assert!(transport.take_input().is_empty());
    }

    #[tokio::test]
    async fn exit_config_requires_authentication() {
        let transport = MockTransport::new();
        let mut session = test_session(transport.clone());
        let report = session.exit_config().await.unwrap();

        assert_eq!(
            report.outcome,
            Outcome::Failed(FailureReason::PreconditionNotMet {
                required: SessionState::Authenticated
            })
        );
        assert!(transport.take_input().is_empty());
    }

    #[tokio::test]
    async fn exit_config_declines_pending_commit_cue() {
        let transport = MockTransport::new();
        transport.queue_output_str(CONFIG_PROMPT);
        transport.respond_with(
            "\r\nUncommitted changes found, commit them before exiting(yes/no/cancel)? [cancel]: ",
        );
        transport.respond_with(OPER_PROMPT);

        let mut session = test_session(transport.clone());
        session.force_state(SessionState::ConfigMode);
        let report = session.exit_config().await.unwrap();

        assert_eq!(report.outcome, Outcome::Succeeded);
        assert_eq!(report.state_after, SessionState::Authenticated);
        assert_eq!(transport.take_input_str(), "end\nno\n");
    }

    #[tokio::test]
    async fn show_diff_captures_output() {
        let transport = MockTransport::new();
        transport.queue_output_str(CONFIG_PROMPT);
        transport.respond_with(&format!(
            "\r\n--- removed\r\n+++ added\r\n+interface Loopback0{CONFIG_PROMPT}"
        ));

        let mut session = test_session(transport.clone());
        session.force_state(SessionState::ConfigMode);
        let report = session.show_config_diff().await.unwrap();

        assert_eq!(report.outcome, Outcome::Succeeded);
        assert!(report.captured.contains("+interface Loopback0"));
        assert_eq!(transport.take_input_str(), "show commit changes diff\n");
    }

    #[tokio::test]
    async fn create_root_user_on_fresh_device() {
        let transport = MockTransport::new();
        transport.queue_output_str("\r\nEnter root-system username: ");
        transport.respond_with("Enter secret: ");
        transport.respond_with("Enter secret again: ");
        transport.respond_with("\r\nUsername: ");

        let mut session = test_session(transport.clone());
        let report = session.create_root_user().await.unwrap();

        assert_eq!(report.outcome, Outcome::Succeeded);
        let input = transport.take_input_str();
        // The login attempt only nudges; the creation dialogue writes
        // the username and the secret twice.
        assert!(input.ends_with("admin\nlab123\nlab123\n"));
    }

    #[tokio::test]
    async fn create_root_user_reports_under_its_own_name_on_login_failure() {
        let transport = MockTransport::new();
        transport.queue_output_str("Username: ");
        transport.respond_with("Password: ");
        transport.respond_with("\r\n% Authentication failed\r\nPassword: ");

        let mut session = test_session(transport);
        let report = session.create_root_user().await.unwrap();

        assert_eq!(report.script, ScriptKind::CreateRootUser);
        assert_eq!(
            report.outcome,
            Outcome::Failed(FailureReason::CredentialsRejected)
        );
    }

    #[tokio::test]
    async fn create_root_user_reports_existing_user() {
        let transport = MockTransport::new();
        transport.queue_output_str("Username: ");
        transport.respond_with("Password: ");
        transport.respond_with(OPER_PROMPT);

        let mut session = test_session(transport);
        let report = session.create_root_user().await.unwrap();

        assert_eq!(report.outcome, Outcome::AlreadyInTargetState);
    }
}
