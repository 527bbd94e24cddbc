//! Service layer owning the human-task state machine.
//!
//! [`HumanTaskService`] is the only writer of task records. Every operation
//! re-reads the record it acts on and writes it back with a conditional
//! update, so two callers racing on one task cannot both win. Completion is
//! the one place the task and process lifecycles meet: the service persists
//! the completed task first and only then asks the engine to resume the
//! waiting instance.

use crate::human_task::{
    domain::{
        ActorId, ClaimOutcome, ClaimRejection, HumanTask, HumanTaskDomainError, NewHumanTask,
        ProcessInstanceId, ProcessVariables, TaskDefId, TaskDefinition, TaskId, TaskQuery,
    },
    ports::{HumanTaskRepository, ProcessEngine, ProcessEngineError, TaskRepositoryError},
    services::HumanTaskConfig,
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Service-level errors for human-task operations.
#[derive(Debug, Error)]
pub enum TaskLifecycleError {
    /// No task has the given identifier.
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// The actor may not claim the task.
    #[error("actor {actor} may not claim task {task_id}: {reason}")]
    Unauthorized {
        /// Task the claim targeted.
        task_id: TaskId,
        /// Actor that attempted the claim.
        actor: ActorId,
        /// Why the claim was refused.
        reason: ClaimRejection,
    },

    /// Another write reached the task first; the caller may re-read and retry.
    #[error("task {0} was modified concurrently")]
    Conflict(TaskId),

    /// The task is completed and accepts no further mutation.
    #[error("task {0} is already completed")]
    AlreadyCompleted(TaskId),

    /// The process instance already has a live task for this node.
    #[error("process {process_id} already has a live task for node {task_def_id}")]
    DuplicateActivation {
        /// Owning process instance.
        process_id: ProcessInstanceId,
        /// Node definition of the live task.
        task_def_id: TaskDefId,
    },

    /// The task definition was rejected.
    #[error(transparent)]
    Validation(#[from] HumanTaskDomainError),

    /// The task store failed.
    #[error("task store unavailable: {0}")]
    StoreUnavailable(#[source] TaskRepositoryError),
}

impl From<TaskRepositoryError> for TaskLifecycleError {
    fn from(err: TaskRepositoryError) -> Self {
        match err {
            TaskRepositoryError::NotFound(task_id) => Self::NotFound(task_id),
            TaskRepositoryError::Conflict { task_id, .. } => Self::Conflict(task_id),
            TaskRepositoryError::DuplicateActivation {
                process_id,
                task_def_id,
            } => Self::DuplicateActivation {
                process_id,
                task_def_id,
            },
            other => Self::StoreUnavailable(other),
        }
    }
}

/// Result type for human-task service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;

/// What happened to the waiting process when a task was completed.
#[derive(Debug, Clone)]
pub enum Resumption {
    /// The engine accepted the resumption request.
    Notified,
    /// The task has no owning process; nothing to resume.
    Standalone,
    /// The task was already completed; the engine was not called again.
    AlreadyCompleted,
    /// The engine rejected the request. The task stays completed.
    Failed(ProcessEngineError),
}

impl Resumption {
    /// Returns `true` when this call delivered the resumption request.
    #[must_use]
    pub const fn is_notified(&self) -> bool {
        matches!(self, Self::Notified)
    }
}

/// Result of [`HumanTaskService::complete`].
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    /// The completed task as stored.
    pub task: HumanTask,
    /// What happened to the owning process.
    pub resumption: Resumption,
}

/// Human-task lifecycle service.
#[derive(Clone)]
pub struct HumanTaskService<R, E, C>
where
    R: HumanTaskRepository,
    E: ProcessEngine,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    engine: Arc<E>,
    clock: Arc<C>,
    config: HumanTaskConfig,
}

impl<R, E, C> HumanTaskService<R, E, C>
where
    R: HumanTaskRepository,
    E: ProcessEngine,
    C: Clock + Send + Sync,
{
    /// Creates a service with the standard [`HumanTaskConfig`].
    #[must_use]
    pub const fn new(repository: Arc<R>, engine: Arc<E>, clock: Arc<C>) -> Self {
        Self {
            repository,
            engine,
            clock,
            config: HumanTaskConfig::standard(),
        }
    }

    /// Replaces the creation limits.
    #[must_use]
    pub fn with_config(mut self, config: HumanTaskConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the creation limits in force.
    #[must_use]
    pub const fn config(&self) -> &HumanTaskConfig {
        &self.config
    }

    /// Creates and stores a task from `definition`.
    ///
    /// The task is reserved when the definition names an assignee and new
    /// otherwise. Creation is a trusted internal call and performs no
    /// authorization.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Validation`] when the definition breaks
    /// the configured limits, [`TaskLifecycleError::DuplicateActivation`] when
    /// the node already has a live task in this process, or
    /// [`TaskLifecycleError::StoreUnavailable`].
    pub async fn create(&self, definition: TaskDefinition) -> TaskLifecycleResult<HumanTask> {
        self.config.check(&definition)?;
        let new_task = NewHumanTask::from_definition(definition, &*self.clock);
        let task = self.repository.insert(&new_task).await?;
        debug!(
            task_id = %task.id(),
            status = %task.status(),
            process_id = ?task.process_id().map(ProcessInstanceId::as_str),
            "created human task"
        );
        Ok(task)
    }

    /// Makes `actor` the sole assignee of the task and starts it.
    ///
    /// Claiming a task the actor already holds succeeds without a write.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`],
    /// [`TaskLifecycleError::Unauthorized`] when the actor is not a candidate,
    /// another actor holds the task, or the task is completed, and
    /// [`TaskLifecycleError::Conflict`] when a concurrent write won.
    pub async fn claim(&self, task_id: TaskId, actor: &ActorId) -> TaskLifecycleResult<HumanTask> {
        let mut task = self.fetch(task_id).await?;
        match task.claim(actor, &*self.clock) {
            Ok(ClaimOutcome::AlreadyHeld) => {
                debug!(task_id = %task_id, actor = %actor, "claim by current assignee");
                Ok(task)
            }
            Ok(ClaimOutcome::Claimed) => {
                let stored = self.persist(&task).await?;
                debug!(task_id = %task_id, actor = %actor, "task claimed");
                Ok(stored)
            }
            Err(reason) => {
                warn!(task_id = %task_id, actor = %actor, %reason, "claim rejected");
                Err(TaskLifecycleError::Unauthorized {
                    task_id,
                    actor: actor.clone(),
                    reason,
                })
            }
        }
    }

    /// Moves the task in progress.
    ///
    /// The caller is expected to have verified the acting user already.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`],
    /// [`TaskLifecycleError::AlreadyCompleted`], or
    /// [`TaskLifecycleError::Conflict`].
    pub async fn start_working(&self, task_id: TaskId) -> TaskLifecycleResult<HumanTask> {
        let mut task = self.fetch(task_id).await?;
        task.start_working(&*self.clock)
            .map_err(|_| TaskLifecycleError::AlreadyCompleted(task_id))?;
        let stored = self.persist(&task).await?;
        debug!(task_id = %task_id, "work started");
        Ok(stored)
    }

    /// Completes the task and resumes its owning process.
    ///
    /// The completed status is stored before the engine is called, and the
    /// engine is called at most once per task: completing an already
    /// completed task writes nothing and notifies nobody. An engine failure
    /// is reported in the outcome and does not undo the completion.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`],
    /// [`TaskLifecycleError::Conflict`] when a concurrent write won, or
    /// [`TaskLifecycleError::StoreUnavailable`].
    pub async fn complete(
        &self,
        task_id: TaskId,
        outcome: ProcessVariables,
    ) -> TaskLifecycleResult<CompletionOutcome> {
        let mut task = self.fetch(task_id).await?;
        if !task.complete(&*self.clock) {
            info!(task_id = %task_id, "task already completed, skipping resumption");
            return Ok(CompletionOutcome {
                task,
                resumption: Resumption::AlreadyCompleted,
            });
        }

        let stored = self.persist(&task).await?;
        info!(task_id = %task_id, "task completed");
        let resumption = self.resume(&stored, &outcome).await;
        Ok(CompletionOutcome {
            task: stored,
            resumption,
        })
    }

    /// Returns every task matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::StoreUnavailable`] when the lookup fails.
    pub async fn query(&self, query: &TaskQuery) -> TaskLifecycleResult<Vec<HumanTask>> {
        Ok(self.repository.find(query).await?)
    }

    /// Returns the first task matching `query`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::StoreUnavailable`] when the lookup fails.
    pub async fn query_one(&self, query: &TaskQuery) -> TaskLifecycleResult<Option<HumanTask>> {
        Ok(self.repository.find_one(query).await?)
    }

    /// Returns the task with identifier `task_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::StoreUnavailable`] when the lookup fails.
    pub async fn find(&self, task_id: TaskId) -> TaskLifecycleResult<Option<HumanTask>> {
        self.query_one(&TaskQuery::by_id(task_id)).await
    }

    async fn fetch(&self, task_id: TaskId) -> TaskLifecycleResult<HumanTask> {
        self.find(task_id)
            .await?
            .ok_or(TaskLifecycleError::NotFound(task_id))
    }

    async fn persist(&self, task: &HumanTask) -> TaskLifecycleResult<HumanTask> {
        self.repository.update(task).await.map_err(|err| {
            if let TaskRepositoryError::Conflict {
                task_id,
                expected,
                actual,
            } = &err
            {
                warn!(task_id = %task_id, %expected, %actual, "conditional task write lost");
            }
            TaskLifecycleError::from(err)
        })
    }

    async fn resume(&self, task: &HumanTask, outcome: &ProcessVariables) -> Resumption {
        let Some(process_id) = task.process_id() else {
            return Resumption::Standalone;
        };
        let Some(task_def_id) = task.task_def_id() else {
            error!(
                task_id = %task.id(),
                process_id = %process_id,
                "completed task has no node definition, cannot resume process"
            );
            return Resumption::Failed(ProcessEngineError::Rejected {
                process_id: process_id.clone(),
                reason: format!("task {} has no task definition identifier", task.id()),
            });
        };

        match self
            .engine
            .complete_task(process_id, task_def_id, outcome)
            .await
        {
            Ok(()) => {
                info!(
                    task_id = %task.id(),
                    process_id = %process_id,
                    task_def_id = %task_def_id,
                    "process resumed"
                );
                Resumption::Notified
            }
            Err(err) => {
                error!(
                    task_id = %task.id(),
                    process_id = %process_id,
                    error = %err,
                    "process engine rejected task completion"
                );
                Resumption::Failed(err)
            }
        }
    }
}
