//! Severity classification for outbound workflow messages
//!
//! Every message published by the broker carries a severity. Together with
//! the operator's message preference it determines whether the message
//! actually reaches the notification topic:
//! - ERROR: workflow failed, always delivered
//! - INFO: workflow completed normally, delivered only under INFO_AND_ERRORS

use serde::{Deserialize, Serialize};

/// Severity level of an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Info => "INFO",
        }
    }
}

/// Which message classes the operator wants on the topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePreference {
    /// Only failure notifications
    ErrorsOnly,
    /// Completion and failure notifications
    InfoAndErrors,
}

impl Default for MessagePreference {
    fn default() -> Self {
        MessagePreference::InfoAndErrors
    }
}

impl MessagePreference {
    /// Parse the configured preference string (case-insensitive)
    ///
    /// Unrecognized values fall back to `InfoAndErrors` so a typo in the
    /// deployment never silences failure notifications.
    pub fn parse(value: &str) -> Self {
        match value.to_uppercase().as_str() {
            "ERRORS_ONLY" => MessagePreference::ErrorsOnly,
            _ => MessagePreference::InfoAndErrors,
        }
    }
}

/// Check whether a message severity passes the configured preference
pub fn severity_meets_preference(severity: Severity, preference: MessagePreference) -> bool {
    match (severity, preference) {
        (Severity::Error, _) => true,
        (Severity::Info, MessagePreference::InfoAndErrors) => true,
        (Severity::Info, MessagePreference::ErrorsOnly) => false,
    }
}
