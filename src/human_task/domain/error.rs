//! Error types for human-task domain validation, parsing, and claims.

use super::{ActorId, TaskId};
use thiserror::Error;

/// Errors returned while constructing or mutating human-task domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HumanTaskDomainError {
    /// An identifier was blank after trimming.
    #[error("{kind} identifier must not be empty")]
    EmptyIdentifier {
        /// Which identifier was rejected.
        kind: &'static str,
    },

    /// The task name is empty after trimming.
    #[error("task name must not be empty")]
    EmptyTaskName,

    /// The task name exceeds the configured limit.
    #[error("task name is {length} characters, limit is {max}")]
    TaskNameTooLong {
        /// Actual character count.
        length: usize,
        /// Configured maximum.
        max: usize,
    },

    /// More candidate users were listed than the configured limit allows.
    #[error("{count} candidate users exceed the limit of {max}")]
    TooManyCandidateUsers {
        /// Number of listed candidates.
        count: usize,
        /// Configured maximum.
        max: usize,
    },

    /// More candidate groups were listed than the configured limit allows.
    #[error("{count} candidate groups exceed the limit of {max}")]
    TooManyCandidateGroups {
        /// Number of listed groups.
        count: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The definition names neither an assignee nor any candidate.
    #[error("task has no assignee and no candidates")]
    MissingCandidates,

    /// A process-owned task must name the node definition that spawned it.
    #[error("task owned by process {0} has no task definition identifier")]
    MissingTaskDefinition(String),

    /// The task is completed and accepts no further mutation.
    #[error("task {0} is already completed")]
    TaskCompleted(TaskId),
}

/// Reason a claim attempt was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClaimRejection {
    /// The actor is not listed in the task's candidate users.
    #[error("actor is not a candidate for the task")]
    NotCandidate,

    /// Another actor already holds the task.
    #[error("task is already claimed by {0}")]
    ClaimedByAnotherActor(ActorId),

    /// The task has reached its terminal state.
    #[error("task is already completed")]
    TaskCompleted,
}

/// Error returned while parsing a task status from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown human task status: {0}")]
pub struct ParseHumanTaskStatusError(pub String);

/// Error returned while converting between a task and its flat record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskRecordError {
    /// The record does not describe a valid human task.
    #[error("malformed task record: {0}")]
    Malformed(String),

    /// The task did not serialize to a flat field map.
    #[error("task did not serialize to a field map")]
    NotAMap,
}
