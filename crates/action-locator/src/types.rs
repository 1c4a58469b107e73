//! Core types for the locator layer

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How an element's text is compared against a criterion's text predicate.
///
/// Both modes compare normalized text (trimmed, lowercased).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Whole-string equality
    #[default]
    Exact,

    /// Containment
    Substring,
}

impl MatchMode {
    pub fn name(&self) -> &'static str {
        match self {
            MatchMode::Exact => "exact",
            MatchMode::Substring => "substring",
        }
    }
}

/// Normalize element or predicate text for comparison.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Describes how to find one element: a structural selector plus an
/// optional text predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    selector: String,
    text: Option<String>,
    mode: MatchMode,
}

impl Criterion {
    /// First element matching `selector`, whatever its text.
    pub fn structural(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: None,
            mode: MatchMode::Exact,
        }
    }

    pub fn exact(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_text(selector, text, MatchMode::Exact)
    }

    pub fn substring(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_text(selector, text, MatchMode::Substring)
    }

    pub fn with_text(selector: impl Into<String>, text: impl Into<String>, mode: MatchMode) -> Self {
        Self {
            selector: selector.into(),
            text: Some(text.into()),
            mode,
        }
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Text predicate, `None` for structural-only criteria
    pub fn match_text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Whether an element with `candidate` as its text content satisfies this criterion.
    pub fn matches_text(&self, candidate: &str) -> bool {
        let Some(wanted) = self.text.as_deref() else {
            return true;
        };
        let wanted = normalize(wanted);
        let candidate = normalize(candidate);
        match self.mode {
            MatchMode::Exact => candidate == wanted,
            MatchMode::Substring => candidate.contains(&wanted),
        }
    }

    /// Short human label: the text predicate when there is one, else the selector.
    pub fn describe(&self) -> &str {
        self.text.as_deref().unwrap_or(&self.selector)
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.text {
            Some(text) => write!(f, "{} [{} \"{}\"]", self.selector, self.mode.name(), text),
            None => f.write_str(&self.selector),
        }
    }
}

/// Attempt ceiling and spacing for one polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryBudget {
    pub max_attempts: u32,
    pub interval_ms: u64,
}

impl RetryBudget {
    pub fn new(max_attempts: u32, interval_ms: u64) -> Self {
        Self {
            max_attempts,
            interval_ms,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Upper bound of time spent sleeping between polls
    pub fn ceiling(&self) -> Duration {
        Duration::from_millis(
            self.interval_ms
                .saturating_mul(u64::from(self.max_attempts.saturating_sub(1))),
        )
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(25, 200)
    }
}
