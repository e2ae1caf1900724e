//! Structured match diagnostics.
//!
//! Every check in the algebra returns a [`ResultReason`] instead of a bare
//! boolean so a caller can see every violated dimension at once, each one
//! prefixed with the path that produced it (`0/core_count: ...`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Accumulator of mismatch reasons plus an overall success flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultReason {
    pub success: bool,
    pub reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    prefix: String,
}

impl Default for ResultReason {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultReason {
    /// A successful result with no reasons.
    pub fn new() -> Self {
        Self {
            success: true,
            reasons: Vec::new(),
            prefix: String::new(),
        }
    }

    /// A failed result carrying a single reason.
    pub fn failed(reason: impl Into<String>) -> Self {
        let mut result = Self::new();
        result.add_reason(reason, "");
        result
    }

    /// Nest all reasons added from now on under `prefix`.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.append_prefix(prefix);
        self
    }

    pub fn append_prefix(&mut self, prefix: &str) {
        if prefix.is_empty() {
            return;
        }
        if self.prefix.is_empty() {
            self.prefix = prefix.to_string();
        } else {
            self.prefix = format!("{}/{prefix}", self.prefix);
        }
    }

    /// Record a mismatch. The result becomes a failure.
    ///
    /// A reason already contained in an existing entry is not repeated.
    pub fn add_reason(&mut self, reason: impl Into<String>, name: &str) {
        self.success = false;

        let reason = reason.into();
        if self.reasons.iter().any(|existing| existing.contains(&reason)) {
            return;
        }

        // Reasons coming from a nested merge already carry a `name: ` part.
        let sep = if reason.contains(':') { "/" } else { ": " };
        let full = match (name.is_empty(), self.prefix.is_empty()) {
            (false, false) => format!("{}/{name}{sep}{reason}", self.prefix),
            (false, true) => format!("{name}{sep}{reason}"),
            (true, false) => format!("{}{sep}{reason}", self.prefix),
            (true, true) => reason,
        };
        self.reasons.push(full);
    }

    /// Fold a sub-result into this one, nesting its reasons under `name`.
    pub fn merge(&mut self, sub: ResultReason, name: &str) {
        self.success = self.success && sub.success;
        for reason in sub.reasons {
            self.add_reason(reason, name);
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

impl fmt::Display for ResultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success {
            write!(f, "success")
        } else {
            write!(f, "{}", self.reasons.join("; "))
        }
    }
}
