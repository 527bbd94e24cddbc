//! Repository port for human-task persistence and lookup.

use crate::human_task::domain::{
    HumanTask, NewHumanTask, ProcessInstanceId, Revision, TaskDefId, TaskId, TaskQuery,
    TaskRecordError,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for human-task repository operations.
pub type TaskRepositoryResult<T> = Result<T, TaskRepositoryError>;

/// Human-task persistence contract.
///
/// Tasks live in their own collection, apart from process-instance storage,
/// so listing or mutating them never loads a process graph.
#[async_trait]
pub trait HumanTaskRepository: Send + Sync {
    /// Stores a new task, assigning its identifier and initial revision.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicateActivation`] when a task that
    /// is not yet completed already exists for the same process instance and
    /// node definition, or [`TaskRepositoryError::DuplicateTask`] on an
    /// identifier collision.
    async fn insert(&self, task: &NewHumanTask) -> TaskRepositoryResult<HumanTask>;

    /// Returns the first task matching `query`, if any.
    async fn find_one(&self, query: &TaskQuery) -> TaskRepositoryResult<Option<HumanTask>>;

    /// Returns every task matching `query`, oldest first.
    async fn find(&self, query: &TaskQuery) -> TaskRepositoryResult<Vec<HumanTask>>;

    /// Writes `task` only if the stored revision still equals
    /// `task.revision()`.
    ///
    /// On success the stored copy carries the next revision and is returned.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::Conflict`] when another write landed
    /// since `task` was read, and [`TaskRepositoryError::NotFound`] when the
    /// task does not exist.
    async fn update(&self, task: &HumanTask) -> TaskRepositoryResult<HumanTask>;
}

/// Errors returned by human-task repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskRepositoryError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The process instance already has a live task for this node.
    #[error("process {process_id} already has a live task for node {task_def_id}")]
    DuplicateActivation {
        /// Owning process instance.
        process_id: ProcessInstanceId,
        /// Node definition of the live task.
        task_def_id: TaskDefId,
    },

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The conditional update lost to a concurrent write.
    #[error("task {task_id} was modified concurrently (expected revision {expected}, found {actual})")]
    Conflict {
        /// Task being written.
        task_id: TaskId,
        /// Revision the writer read.
        expected: Revision,
        /// Revision currently stored.
        actual: Revision,
    },

    /// A stored record could not be converted to or from a task.
    #[error(transparent)]
    Record(#[from] TaskRecordError),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
