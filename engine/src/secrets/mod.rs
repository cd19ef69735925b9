//! API credentials
//!
//! Cloud provider keys are read from the process environment once at startup.
//! A key only counts as configured when it looks like a real key (`sk-` prefix);
//! placeholders such as `changeme` leave the provider out of the router.

pub mod string;

pub use string::SecretString;

use regex::Regex;
use std::sync::OnceLock;

pub const ANTHROPIC_KEY_VAR: &str = "ANTHROPIC_API_KEY";
pub const DEEPSEEK_KEY_VAR: &str = "DEEPSEEK_API_KEY";
pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";

const KEY_PREFIX: &str = "sk-";

/// Credentials for the cloud providers
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub anthropic: Option<SecretString>,
    pub deepseek: Option<SecretString>,
    pub openai: Option<SecretString>,
}

impl ApiKeys {
    /// Read keys from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read keys through an arbitrary lookup (used by tests)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |var: &str| {
            let value = lookup(var)?;
            let value = value.trim();
            if value.starts_with(KEY_PREFIX) {
                Some(SecretString::new(value))
            } else {
                tracing::info!("{} is set but does not look like an API key, ignoring", var);
                None
            }
        };

        Self {
            anthropic: read(ANTHROPIC_KEY_VAR),
            deepseek: read(DEEPSEEK_KEY_VAR),
            openai: read(OPENAI_KEY_VAR),
        }
    }
}

/// Regex patterns for detecting common secret formats.
static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

fn get_secret_patterns() -> &'static [Regex] {
    SECRET_PATTERNS.get_or_init(|| {
        [
            // sk-... style keys (Anthropic, DeepSeek, OpenAI)
            r"sk-[a-zA-Z0-9\-_]{20,}",
            // Bearer tokens echoed back in error bodies
            r"Bearer\s+[^\s]{20,}",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Replace anything that looks like a credential with `[REDACTED]`.
///
/// Provider error bodies can echo request headers back; run them through this
/// before they reach the event log.
pub fn scrub(text: &str) -> String {
    let mut scrubbed = text.to_string();
    for pattern in get_secret_patterns() {
        scrubbed = pattern.replace_all(&scrubbed, "[REDACTED]").into_owned();
    }
    scrubbed
}
