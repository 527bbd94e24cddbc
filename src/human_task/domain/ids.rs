//! Identifier and validated scalar types for the human-task domain.

use super::HumanTaskDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a human-task record, assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new random task identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a task identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<Uuid> for TaskId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic write counter of a stored task record.
///
/// Starts at [`Revision::INITIAL`] on insert and is advanced by the store on
/// every successful conditional update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(u64);

impl Revision {
    /// Revision assigned to a freshly inserted record.
    pub const INITIAL: Self = Self(1);

    /// Wraps a raw revision number.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw revision number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns the revision that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trims `value` and rejects it when nothing is left.
fn non_blank(value: String, kind: &'static str) -> Result<String, HumanTaskDomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(HumanTaskDomainError::EmptyIdentifier { kind });
    }
    if trimmed.len() == value.len() {
        return Ok(value);
    }
    Ok(trimmed.to_owned())
}

/// Identifier of a human actor, resolved by the API layer before it reaches
/// the lifecycle service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    /// Creates a validated actor identifier.
    ///
    /// # Errors
    ///
    /// Returns [`HumanTaskDomainError::EmptyIdentifier`] when the value is
    /// blank after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, HumanTaskDomainError> {
        non_blank(value.into(), "actor").map(Self)
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ActorId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an actor group listed as a task candidate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    /// Creates a validated group identifier.
    ///
    /// # Errors
    ///
    /// Returns [`HumanTaskDomainError::EmptyIdentifier`] when the value is
    /// blank after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, HumanTaskDomainError> {
        non_blank(value.into(), "group").map(Self)
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of the process instance that owns a task.
///
/// The value is opaque to this crate; it is whatever the process engine uses
/// to address a running instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessInstanceId(String);

impl ProcessInstanceId {
    /// Creates a validated process instance identifier.
    ///
    /// # Errors
    ///
    /// Returns [`HumanTaskDomainError::EmptyIdentifier`] when the value is
    /// blank after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, HumanTaskDomainError> {
        non_blank(value.into(), "process instance").map(Self)
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a process definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessDefinitionId(String);

impl ProcessDefinitionId {
    /// Creates a validated process definition identifier.
    ///
    /// # Errors
    ///
    /// Returns [`HumanTaskDomainError::EmptyIdentifier`] when the value is
    /// blank after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, HumanTaskDomainError> {
        non_blank(value.into(), "process definition").map(Self)
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessDefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of the human-task node definition that spawned a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskDefId(String);

impl TaskDefId {
    /// Creates a validated node definition identifier.
    ///
    /// # Errors
    ///
    /// Returns [`HumanTaskDomainError::EmptyIdentifier`] when the value is
    /// blank after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, HumanTaskDomainError> {
        non_blank(value.into(), "task definition").map(Self)
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskDefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
