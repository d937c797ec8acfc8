//! Prompt classification.
//!
//! [`classify`] maps one trimmed line of console output to a
//! [`PromptKind`] through a fixed, priority-ordered rule list. The
//! classifier is deterministic, total, and side-effect-free: it never
//! inspects session state, so the same line always yields the same kind
//! and the function can be tested in isolation. All context sensitivity
//! (what a prompt *means* mid-dialogue) belongs to the dialogue engine.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// The IOS XR identity prefix: `RP/<slot>/<slot>/CPU<n>:<hostname>`.
///
/// Matches both operational (`RP/0/0/CPU0:ios#`) and configuration
/// (`RP/0/0/CPU0:ios(config)#`) prompts; the mode delimiter and config
/// marker are checked separately by the pattern rules.
static IDENTITY_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^RP/\d+/(?:RP)?\d+/CPU\d+:[\w.-]+").unwrap_or_else(|e| {
        // The pattern is a compile-time constant; this cannot fail.
        unreachable!("identity prompt regex is invalid: {e}")
    })
});

/// What kind of input the device is asking for, judged from its
/// trailing output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    /// Operational (exec) prompt: identity prefix ending in `#`.
    Operational,

    /// Operational prompt while in configuration mode: identity prefix
    /// with a `(config` marker, ending in `#`.
    OperationalConfig,

    /// A username is being requested (`Username:`, including the
    /// first-boot `root-system username:` form).
    Username,

    /// A password is being requested.
    Password,

    /// A secret is being requested (root-user provisioning).
    Secret,

    /// The secret is being requested a second time for confirmation.
    SecretConfirm,

    /// The device asks whether existing data may be replaced
    /// (`... replace them? [yes/no]`).
    OverwriteConfirm,

    /// Nothing recognizable; also returned for empty input.
    Unknown,
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Operational => "operational prompt",
            Self::OperationalConfig => "config-mode prompt",
            Self::Username => "username prompt",
            Self::Password => "password prompt",
            Self::Secret => "secret prompt",
            Self::SecretConfirm => "secret confirmation prompt",
            Self::OverwriteConfirm => "overwrite confirmation",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// How a single rule inspects a line.
#[derive(Debug, Clone, Copy)]
enum Matcher {
    /// Identity prefix plus trailing `#`; `config_marker` additionally
    /// requires a `(config` substring.
    IdentityPrompt {
        /// Require the `(config` marker.
        config_marker: bool,
    },

    /// The line ends with one of these suffixes.
    SuffixAny(&'static [&'static str]),

    /// The line contains *all* of these substrings. A true conjunction:
    /// every cue must be present for the rule to fire.
    ContainsAll(&'static [&'static str]),
}

impl Matcher {
    fn matches(self, line: &str) -> bool {
        match self {
            Self::IdentityPrompt { config_marker } => {
                line.ends_with('#')
                    && IDENTITY_PREFIX.is_match(line)
                    && (!config_marker || line.contains("(config"))
            }
            Self::SuffixAny(suffixes) => suffixes.iter().any(|s| line.ends_with(s)),
            Self::ContainsAll(cues) => cues.iter().all(|c| line.contains(c)),
        }
    }
}

/// One immutable classification rule: a matcher and the kind it yields.
#[derive(Debug, Clone, Copy)]
struct PromptPattern {
    matcher: Matcher,
    kind: PromptKind,
}

/// The fixed rule list, most specific first. Ties are broken by this
/// order, never by recency.
const RULES: &[PromptPattern] = &[
    PromptPattern {
        matcher: Matcher::IdentityPrompt { config_marker: true },
        kind: PromptKind::OperationalConfig,
    },
    PromptPattern {
        matcher: Matcher::IdentityPrompt {
            config_marker: false,
        },
        kind: PromptKind::Operational,
    },
    PromptPattern {
        matcher: Matcher::SuffixAny(&["Username:", "username:"]),
        kind: PromptKind::Username,
    },
    PromptPattern {
        matcher: Matcher::SuffixAny(&["Password:", "password:"]),
        kind: PromptKind::Password,
    },
    PromptPattern {
        // Ordered before the bare secret rule: more specific suffix.
        matcher: Matcher::SuffixAny(&["Enter secret again:"]),
        kind: PromptKind::SecretConfirm,
    },
    PromptPattern {
        matcher: Matcher::SuffixAny(&["Enter secret:"]),
        kind: PromptKind::Secret,
    },
    PromptPattern {
        matcher: Matcher::ContainsAll(&["replace", "yes/no"]),
        kind: PromptKind::OverwriteConfirm,
    },
];

/// Classify one line of console output.
///
/// The input is trimmed before matching; an empty or all-whitespace line
/// classifies as [`PromptKind::Unknown`].
#[must_use]
pub fn classify(line: &str) -> PromptKind {
    let line = line.trim();
    if line.is_empty() {
        return PromptKind::Unknown;
    }
    for rule in RULES {
        if rule.matcher.matches(line) {
            return rule.kind;
        }
    }
    PromptKind::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operational_prompt() {
        assert_eq!(classify("RP/0/0/CPU0:ios#"), PromptKind::Operational);
        assert_eq!(classify("RP/0/RP0/CPU0:core-rtr1#"), PromptKind::Operational);
    }

    #[test]
    fn config_prompt_beats_operational() {
        assert_eq!(
            classify("RP/0/0/CPU0:ios(config)#"),
            PromptKind::OperationalConfig
        );
        assert_eq!(
            classify("RP/0/0/CPU0:ios(config-if)#"),
            PromptKind::OperationalConfig
        );
    }

    #[test]
    fn credential_prompts() {
        assert_eq!(classify("Username: "), PromptKind::Username);
        assert_eq!(
            classify("Enter root-system username:"),
            PromptKind::Username
        );
        assert_eq!(classify("Password:"), PromptKind::Password);
    }

    #[test]
    fn secret_prompts() {
        assert_eq!(classify("Enter secret:"), PromptKind::Secret);
        assert_eq!(classify("Enter secret again:"), PromptKind::SecretConfirm);
    }

    #[test]
    fn overwrite_confirm_is_conjunctive() {
        assert_eq!(
            classify("% Do you really want to replace them? [yes/no]:"),
            PromptKind::OverwriteConfirm
        );
        // Either cue alone must not fire the rule.
        assert_eq!(classify("replace the module"), PromptKind::Unknown);
        assert_eq!(classify("continue? [yes/no]:"), PromptKind::Unknown);
    }

    #[test]
    fn noise_is_unknown() {
        assert_eq!(classify(""), PromptKind::Unknown);
        assert_eq!(classify("   "), PromptKind::Unknown);
        assert_eq!(classify("Building configuration..."), PromptKind::Unknown);
        // A bare `#` without the identity prefix is not a prompt.
        assert_eq!(classify("#"), PromptKind::Unknown);
        assert_eq!(classify("interface GigabitEthernet0/0/0/0 #"), PromptKind::Unknown);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(classify("  RP/0/0/CPU0:ios#  "), PromptKind::Operational);
    }
}
