//! Human-task lifecycle status.

use super::ParseHumanTaskStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a human task.
///
/// The serialized names are the ones stored in the flat task record and the
/// values external callers filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HumanTaskStatus {
    /// Created without an assignee; any candidate may claim it.
    #[serde(rename = "New")]
    New,
    /// Created with a fixed assignee.
    #[serde(rename = "Reserved")]
    Reserved,
    /// An actor is working the task.
    #[serde(rename = "In Progress")]
    InProgress,
    /// Terminal.
    #[serde(rename = "Completed")]
    Completed,
}

impl HumanTaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Reserved => "Reserved",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }

    /// Returns `true` when no further mutation is permitted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for HumanTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for HumanTaskStatus {
    type Error = ParseHumanTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', " ");
        match normalized.as_str() {
            "new" => Ok(Self::New),
            "reserved" => Ok(Self::Reserved),
            "in progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseHumanTaskStatusError(value.to_owned())),
        }
    }
}
