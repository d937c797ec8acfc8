//! Dialogue script definitions.
//!
//! A [`Script`] is an ordered rule list: each [`Step`] names the prompt
//! kinds it answers, an optional raw-line guard, the action to take, and
//! a repeat policy. On every engine cycle the classified prompt is
//! checked against the steps in declaration order and the first eligible
//! step fires; order therefore encodes priority, exactly like the
//! classifier's own rule list. Scripts are configuration, not runtime
//! state; the engine keeps all mutable bookkeeping.

use crate::prompt::PromptKind;
use crate::state::SessionState;
use crate::types::FailureReason;

/// Exec command that generates the default RSA key pair.
pub const CRYPTO_KEYGEN_COMMAND: &str = "crypto key generate rsa";

/// Exec command entering shared configuration mode.
pub const CONFIGURE_TERMINAL_COMMAND: &str = "configure terminal";

/// Exec command entering exclusive configuration mode.
pub const CONFIGURE_EXCLUSIVE_COMMAND: &str = "configure exclusive";

/// Config-mode command that ends the configuration session.
pub const END_COMMAND: &str = "end";

/// Config-mode command showing the uncommitted diff.
pub const SHOW_DIFF_COMMAND: &str = "show commit changes diff";

/// Bounded step counter for the key-generation dialogue, distinct from
/// the generic retry budget: it guards against the device re-displaying
/// the operational prompt without ever producing the confirmation cue.
pub const CRYPTO_STEP_BOUND: u32 = 50;

/// The named dialogue a script implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// Username/password round-trip to an operational prompt.
    Login,
    /// First-boot root-system user provisioning.
    CreateRootUser,
    /// RSA key generation with deterministic overwrite answer.
    GenerateCryptoKeys,
    /// Enter configuration mode.
    EnterConfig,
    /// Leave configuration mode, declining any pending-commit cue.
    ExitConfig,
    /// Capture the uncommitted configuration diff.
    ShowDiff,
}

impl ScriptKind {
    /// Script name for logging.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::CreateRootUser => "create-root-user",
            Self::GenerateCryptoKeys => "generate-crypto-keys",
            Self::EnterConfig => "enter-config",
            Self::ExitConfig => "exit-config",
            Self::ShowDiff => "show-diff",
        }
    }
}

/// What a step does once its prompt arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Write the session username.
    SendUsername,

    /// Write the session secret.
    SendSecret,

    /// Write the session secret and record that the confirmation round
    /// was reached (distinguishes "created" from "already existed").
    SendSecretConfirm,

    /// Write a fixed command line.
    SendLine(&'static str),

    /// Answer a yes/no cue; `true` writes `yes`, `false` writes `no`.
    Answer(bool),

    /// Terminate the dialogue successfully.
    Succeed,

    /// Terminate root-user creation: succeeded if the confirmation
    /// secret was supplied, already-existed otherwise.
    FinishUserCreate,
}

/// One expect/act rule of a script.
#[derive(Debug, Clone)]
pub struct Step {
    /// Prompt kinds this step answers.
    pub expects: &'static [PromptKind],

    /// Extra raw-line guard: the step only fires when the classified
    /// line contains this substring. Used where one `PromptKind` covers
    /// two textual prompts (e.g. `root-system username:` vs `Username:`).
    pub only_if_contains: Option<&'static str>,

    /// Negative raw-line guard: the step never fires when the line
    /// contains this substring.
    pub not_if_contains: Option<&'static str>,

    /// The action taken on match.
    pub action: StepAction,

    /// Disable this step after it fires once.
    pub once: bool,

    /// If a `once` step's prompt recurs after the step fired, terminate
    /// with this failure instead of treating the cycle as unmatched.
    pub fail_on_repeat: Option<FailureReason>,
}

impl Step {
    /// Create a step answering the given prompt kinds.
    #[must_use]
    pub const fn on(expects: &'static [PromptKind], action: StepAction) -> Self {
        Self {
            expects,
            only_if_contains: None,
            not_if_contains: None,
            action,
            once: false,
            fail_on_repeat: None,
        }
    }

    /// Require a substring in the raw line.
    #[must_use]
    pub const fn only_if_contains(mut self, needle: &'static str) -> Self {
        self.only_if_contains = Some(needle);
        self
    }

    /// Reject lines containing a substring.
    #[must_use]
    pub const fn not_if_contains(mut self, needle: &'static str) -> Self {
        self.not_if_contains = Some(needle);
        self
    }

    /// Disable the step after one firing.
    #[must_use]
    pub const fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// Fail the dialogue if this step's prompt recurs after firing.
    #[must_use]
    pub fn fail_on_repeat(mut self, reason: FailureReason) -> Self {
        self.once = true;
        self.fail_on_repeat = Some(reason);
        self
    }

    /// Check whether this step answers the given classified line.
    #[must_use]
    pub fn accepts(&self, kind: PromptKind, line: &str) -> bool {
        self.expects.contains(&kind)
            && self.only_if_contains.is_none_or(|n| line.contains(n))
            && self.not_if_contains.is_none_or(|n| !line.contains(n))
    }
}

/// An immutable dialogue script.
#[derive(Debug, Clone)]
pub struct Script {
    /// Which dialogue this is.
    pub kind: ScriptKind,

    /// The ordered expect/act rules.
    pub steps: Vec<Step>,

    /// Session state that must hold before the script starts; checked
    /// (with one probing drain) and reported as a precondition failure
    /// otherwise.
    pub requires: Option<SessionState>,

    /// End state used for the idempotent short-circuit: if the session
    /// is already there, the script reports `AlreadyInTargetState` with
    /// zero writes.
    pub target: Option<SessionState>,

    /// Send a bare line ending on unmatched prompts to provoke a fresh
    /// one.
    pub nudge: bool,

    /// Script-specific bound on total engine cycles, overriding the
    /// configured default.
    pub cycle_bound: Option<u32>,

    /// Accumulate drained text after the first command send (the
    /// show-diff capture).
    pub capture_output: bool,
}

impl Script {
    /// Username/password login ending at an operational prompt.
    ///
    /// A second password prompt after the secret was written means the
    /// device rejected the credentials; that is surfaced, not retried,
    /// since blind resubmission risks lockout. The first-boot
    /// `root-system username:` prompt is deliberately *not* answered:
    /// login on an unprovisioned device times out and the caller falls
    /// through to [`Script::create_root_user`].
    #[must_use]
    pub fn login() -> Self {
        use PromptKind as K;
        Self {
            kind: ScriptKind::Login,
            steps: vec![
                Step::on(&[K::Operational, K::OperationalConfig], StepAction::Succeed),
                Step::on(&[K::Username], StepAction::SendUsername)
                    .not_if_contains("root-system"),
                Step::on(&[K::Password], StepAction::SendSecret)
                    .fail_on_repeat(FailureReason::CredentialsRejected),
            ],
            requires: None,
            target: Some(SessionState::Authenticated),
            nudge: true,
            cycle_bound: None,
            capture_output: false,
        }
    }

    /// Root-system user provisioning on a freshly booted device.
    ///
    /// Reaching a plain `Username:` prompt after the confirmation secret
    /// was supplied means the user was created; reaching it without one
    /// means a user already existed. Both terminate the script, with
    /// distinct outcomes.
    #[must_use]
    pub fn create_root_user() -> Self {
        use PromptKind as K;
        Self {
            kind: ScriptKind::CreateRootUser,
            steps: vec![
                Step::on(&[K::SecretConfirm], StepAction::SendSecretConfirm),
                Step::on(&[K::Secret], StepAction::SendSecret),
                Step::on(&[K::Username], StepAction::SendUsername)
                    .only_if_contains("root-system"),
                Step::on(&[K::Username], StepAction::FinishUserCreate),
            ],
            requires: None,
            target: None,
            nudge: true,
            cycle_bound: None,
            capture_output: false,
        }
    }

    /// RSA key generation; `overwrite` deterministically answers the
    /// replace-existing-keys cue.
    #[must_use]
    pub fn generate_crypto_keys(overwrite: bool) -> Self {
        use PromptKind as K;
        Self {
            kind: ScriptKind::GenerateCryptoKeys,
            steps: vec![
                Step::on(&[K::Operational], StepAction::SendLine(CRYPTO_KEYGEN_COMMAND)).once(),
                Step::on(&[K::OverwriteConfirm], StepAction::Answer(overwrite)).once(),
                Step::on(&[K::Operational], StepAction::Succeed),
            ],
            requires: Some(SessionState::Authenticated),
            target: None,
            nudge: true,
            cycle_bound: Some(CRYPTO_STEP_BOUND),
            capture_output: false,
        }
    }

    /// Enter configuration mode, exclusively when asked. Idempotent.
    #[must_use]
    pub fn enter_config(exclusive: bool) -> Self {
        use PromptKind as K;
        let command = if exclusive {
            CONFIGURE_EXCLUSIVE_COMMAND
        } else {
            CONFIGURE_TERMINAL_COMMAND
        };
        Self {
            kind: ScriptKind::EnterConfig,
            steps: vec![
                Step::on(&[K::OperationalConfig], StepAction::Succeed),
                Step::on(&[K::Operational], StepAction::SendLine(command)).fail_on_repeat(
                    FailureReason::UnexpectedPrompt {
                        kind: K::Operational,
                    },
                ),
            ],
            requires: Some(SessionState::Authenticated),
            target: Some(SessionState::ConfigMode),
            nudge: true,
            cycle_bound: None,
            capture_output: false,
        }
    }

    /// Leave configuration mode.
    ///
    /// The device can refuse a bare `end` while uncommitted changes
    /// exist; the pending-commit cue (unknown to the classifier, matched
    /// on its `cancel` cue) is answered `no` before re-checking mode.
    #[must_use]
    pub fn exit_config() -> Self {
        use PromptKind as K;
        Self {
            kind: ScriptKind::ExitConfig,
            steps: vec![
                Step::on(&[K::Operational], StepAction::Succeed),
                Step::on(&[K::OperationalConfig], StepAction::SendLine(END_COMMAND)).once(),
                Step::on(&[K::Unknown], StepAction::Answer(false)).only_if_contains("cancel"),
            ],
            requires: Some(SessionState::Authenticated),
            target: Some(SessionState::Authenticated),
            nudge: true,
            cycle_bound: None,
            capture_output: false,
        }
    }

    /// Capture the uncommitted configuration diff. Read-only: no state
    /// transition, the report carries the captured text.
    #[must_use]
    pub fn show_diff() -> Self {
        use PromptKind as K;
        Self {
            kind: ScriptKind::ShowDiff,
            steps: vec![
                Step::on(&[K::OperationalConfig], StepAction::SendLine(SHOW_DIFF_COMMAND)).once(),
                Step::on(&[K::OperationalConfig], StepAction::Succeed),
            ],
            requires: Some(SessionState::ConfigMode),
            target: None,
            nudge: false,
            cycle_bound: None,
            capture_output: true,
        }
    }
}

/// Bounded counter of unmatched read/classify cycles.
#[derive(Debug, Clone, Copy)]
pub struct RetryBudget {
    remaining: u32,
    spent: u32,
}

impl RetryBudget {
    /// Create a budget of `attempts` unmatched cycles.
    #[must_use]
    pub const fn new(attempts: u32) -> Self {
        Self {
            remaining: attempts,
            spent: 0,
        }
    }

    /// Spend one attempt; returns `false` when the budget is exhausted.
    pub const fn spend(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.spent += 1;
        self.remaining > 0
    }

    /// Attempts spent so far.
    #[must_use]
    pub const fn spent(&self) -> u32 {
        self.spent
    }

    /// Attempts left.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::PromptKind as K;

    #[test]
    fn step_guards() {
        let step = Step::on(&[K::Username], StepAction::SendUsername)
            .only_if_contains("root-system");
        assert!(step.accepts(K::Username, "Enter root-system username:"));
        assert!(!step.accepts(K::Username, "Username:"));
        assert!(!step.accepts(K::Password, "Enter root-system username:"));

        let step = Step::on(&[K::Username], StepAction::SendUsername)
            .not_if_contains("root-system");
        assert!(step.accepts(K::Username, "Username:"));
        assert!(!step.accepts(K::Username, "Enter root-system username:"));
    }

    #[test]
    fn login_script_shape() {
        let script = Script::login();
        assert_eq!(script.kind, ScriptKind::Login);
        assert_eq!(script.target, Some(crate::SessionState::Authenticated));
        // The password step must be single-shot with a rejection policy.
        let password = script
            .steps
            .iter()
            .find(|s| s.expects == [K::Password])
            .unwrap();
        assert!(password.once);
        assert_eq!(
            password.fail_on_repeat,
            Some(FailureReason::CredentialsRejected)
        );
    }

    #[test]
    fn create_root_user_orders_root_system_first() {
        let script = Script::create_root_user();
        let username_steps: Vec<_> = script
            .steps
            .iter()
            .filter(|s| s.expects.contains(&K::Username))
            .collect();
        assert_eq!(username_steps.len(), 2);
        // The guarded root-system step must shadow the terminal step.
        assert_eq!(username_steps[0].only_if_contains, Some("root-system"));
        assert_eq!(username_steps[1].action, StepAction::FinishUserCreate);
    }

    #[test]
    fn crypto_script_has_distinct_bound() {
        let script = Script::generate_crypto_keys(true);
        assert_eq!(script.cycle_bound, Some(CRYPTO_STEP_BOUND));
        assert_eq!(script.requires, Some(crate::SessionState::Authenticated));
    }

    #[test]
    fn retry_budget_terminates() {
        let mut budget = RetryBudget::new(3);
        assert!(budget.spend());
        assert!(budget.spend());
        assert!(!budget.spend());
        assert!(!budget.spend());
        assert_eq!(budget.spent(), 3);
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn zero_budget_spends_nothing() {
        let mut budget = RetryBudget::new(0);
        assert!(!budget.spend());
        assert_eq!(budget.spent(), 0);
    }
}
