//! Domain model for human tasks.
//!
//! Covers the task record and its flat storage form, the claim/start/complete
//! state machine, task definitions, and record queries. Infrastructure and
//! the surrounding process engine stay outside this boundary.

mod definition;
mod error;
mod ids;
mod query;
mod status;
mod task;

pub use definition::{ProcessVariables, TaskDefinition, TaskProperties};
pub use error::{ClaimRejection, HumanTaskDomainError, ParseHumanTaskStatusError, TaskRecordError};
pub use ids::{
    ActorId, GroupId, ProcessDefinitionId, ProcessInstanceId, Revision, TaskDefId, TaskId,
};
pub use query::TaskQuery;
pub use status::HumanTaskStatus;
pub use task::{ClaimOutcome, HumanTask, NewHumanTask, TaskKind, TaskRecord, WorkflowTaskBase};
