//! Ports to the surrounding process engine.
//!
//! The engine owns process definitions, instances, and graph traversal. This
//! crate only needs two things from it: a handle on the instance that reached
//! a human-task node, and an entry point that resumes that instance once the
//! task is completed.

use crate::human_task::domain::{
    ProcessDefinitionId, ProcessInstanceId, ProcessVariables, TaskDefId,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for process engine operations.
pub type ProcessEngineResult<T> = Result<T, ProcessEngineError>;

/// Status of a process instance as far as this crate drives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessStatus {
    /// Executing nodes.
    Running,
    /// Suspended until an external action completes.
    Waiting,
    /// Finished.
    Completed,
    /// Halted by an unrecoverable error.
    Failed,
}

/// Identity and display name of a process definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessDefinitionRef {
    id: ProcessDefinitionId,
    name: String,
}

impl ProcessDefinitionRef {
    /// Creates a definition reference.
    #[must_use]
    pub fn new(id: ProcessDefinitionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Returns the definition identifier.
    #[must_use]
    pub const fn id(&self) -> &ProcessDefinitionId {
        &self.id
    }

    /// Returns the definition's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Handle on the process instance executing a node.
///
/// Passed into node execution by the engine; nodes never own the instance.
#[async_trait]
pub trait ProcessInstance: Send + Sync {
    /// Returns the instance identifier.
    fn id(&self) -> &ProcessInstanceId;

    /// Returns the definition this instance runs.
    fn definition(&self) -> &ProcessDefinitionRef;

    /// Returns a snapshot of the instance's current variables.
    fn variables(&self) -> ProcessVariables;

    /// Transitions the instance to `status`.
    async fn change_status(&self, status: ProcessStatus) -> ProcessEngineResult<()>;
}

/// Resumption entry point of the process engine.
#[async_trait]
pub trait ProcessEngine: Send + Sync {
    /// Resumes `process_id`, which is waiting on the node `task_def_id`, with
    /// the task's outcome `variables`.
    async fn complete_task(
        &self,
        process_id: &ProcessInstanceId,
        task_def_id: &TaskDefId,
        variables: &ProcessVariables,
    ) -> ProcessEngineResult<()>;
}

/// Errors reported by the process engine.
#[derive(Debug, Clone, Error)]
pub enum ProcessEngineError {
    /// The engine has no instance with this identifier.
    #[error("process instance {0} not found")]
    InstanceNotFound(ProcessInstanceId),

    /// The engine refused the request.
    #[error("process {process_id} rejected the request: {reason}")]
    Rejected {
        /// Instance that refused.
        process_id: ProcessInstanceId,
        /// Engine-supplied explanation.
        reason: String,
    },

    /// Generic engine failure.
    #[error("process engine error: {0}")]
    Runtime(Arc<dyn std::error::Error + Send + Sync>),
}

impl ProcessEngineError {
    /// Wraps a runtime error from the engine.
    pub fn runtime(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Runtime(Arc::new(err))
    }
}
