//! Workflow-graph node that hands work to a human and suspends its process.

use crate::human_task::{
    domain::{ActorId, GroupId, TaskDefId, TaskDefinition, TaskId, TaskProperties},
    ports::{HumanTaskRepository, ProcessEngine, ProcessEngineError, ProcessInstance, ProcessStatus},
    services::{HumanTaskService, TaskLifecycleError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Static task configuration authored on a human-task node.
#[derive(Debug, Clone, PartialEq)]
pub struct HumanTaskNodeConfig {
    id: TaskDefId,
    name: String,
    assignee: Option<ActorId>,
    candidate_users: Vec<ActorId>,
    candidate_groups: Vec<GroupId>,
    properties: TaskProperties,
}

impl HumanTaskNodeConfig {
    /// Creates a node configuration with its definition identifier and task
    /// name.
    #[must_use]
    pub fn new(id: TaskDefId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            assignee: None,
            candidate_users: Vec::new(),
            candidate_groups: Vec::new(),
            properties: TaskProperties::new(),
        }
    }

    /// Sets a fixed assignee.
    #[must_use]
    pub fn with_assignee(mut self, assignee: ActorId) -> Self {
        self.assignee = Some(assignee);
        self
    }

    /// Sets the candidate users.
    #[must_use]
    pub fn with_candidate_users(mut self, users: impl IntoIterator<Item = ActorId>) -> Self {
        self.candidate_users = users.into_iter().collect();
        self
    }

    /// Sets the candidate groups.
    #[must_use]
    pub fn with_candidate_groups(mut self, groups: impl IntoIterator<Item = GroupId>) -> Self {
        self.candidate_groups = groups.into_iter().collect();
        self
    }

    /// Sets runtime properties copied onto every task the node creates.
    #[must_use]
    pub fn with_properties(mut self, properties: TaskProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Returns the node definition identifier.
    #[must_use]
    pub const fn id(&self) -> &TaskDefId {
        &self.id
    }

    /// Returns the task name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Layers this node's fields over a process-derived definition.
    ///
    /// Node-authored values win. An unset assignee or empty candidate list
    /// leaves the incoming value alone.
    #[must_use]
    pub fn apply_to(&self, definition: TaskDefinition) -> TaskDefinition {
        let mut merged = definition
            .with_task_def_id(self.id.clone())
            .with_name(self.name.clone())
            .with_properties(self.properties.clone());
        if let Some(assignee) = &self.assignee {
            merged = merged.with_assignee(assignee.clone());
        }
        if !self.candidate_users.is_empty() {
            merged = merged.with_candidate_users(self.candidate_users.iter().cloned());
        }
        if !self.candidate_groups.is_empty() {
            merged = merged.with_candidate_groups(self.candidate_groups.iter().cloned());
        }
        merged
    }
}

/// Errors raised while executing a human-task node.
#[derive(Debug, Error)]
pub enum HumanTaskNodeError {
    /// The node already created a task for this activation.
    #[error("node already created task {0} for this activation")]
    AlreadyActivated(TaskId),

    /// The task could not be created; the process was not suspended.
    #[error("failed to create human task")]
    Create(#[source] TaskLifecycleError),

    /// The task exists but the process could not be moved to waiting.
    ///
    /// The task stays live and keeps its activation: this node will not run
    /// again and a fresh node for the same activation is refused. Completing
    /// the task still resumes the process, so the engine owns `task_id` and
    /// must either retry the suspension or make sure the task is never
    /// completed.
    #[error("created task {task_id} but could not suspend the process")]
    Suspend {
        /// Task that was created.
        task_id: TaskId,
        /// Engine failure.
        #[source]
        source: ProcessEngineError,
    },
}

/// Builds the process-derived half of a task definition.
fn process_definition<P>(instance: &P) -> TaskDefinition
where
    P: ProcessInstance + ?Sized,
{
    let definition = instance.definition();
    TaskDefinition::default()
        .with_process_id(instance.id().clone())
        .with_process_name(definition.name())
        .with_definition_id(definition.id().clone())
        .with_process_variables(instance.variables())
}

/// Human-task node of a process graph.
///
/// Executing the node creates one task and parks the owning instance in
/// [`ProcessStatus::Waiting`]. The node never signals its own completion;
/// the lifecycle service resumes the process through the engine when the
/// task is completed.
pub struct HumanTaskNode<R, E, C>
where
    R: HumanTaskRepository,
    E: ProcessEngine,
    C: Clock + Send + Sync,
{
    config: HumanTaskNodeConfig,
    service: Arc<HumanTaskService<R, E, C>>,
    task_id: Option<TaskId>,
}

impl<R, E, C> HumanTaskNode<R, E, C>
where
    R: HumanTaskRepository,
    E: ProcessEngine,
    C: Clock + Send + Sync,
{
    /// Creates a node backed by `service`.
    #[must_use]
    pub const fn new(config: HumanTaskNodeConfig, service: Arc<HumanTaskService<R, E, C>>) -> Self {
        Self {
            config,
            service,
            task_id: None,
        }
    }

    /// Returns the node configuration.
    #[must_use]
    pub const fn config(&self) -> &HumanTaskNodeConfig {
        &self.config
    }

    /// Returns the task created by the last successful execution.
    #[must_use]
    pub const fn task_id(&self) -> Option<TaskId> {
        self.task_id
    }

    /// Creates this activation's task and suspends `instance`.
    ///
    /// # Errors
    ///
    /// Returns [`HumanTaskNodeError::Create`] when the task cannot be
    /// created, in which case the instance status is left alone, and
    /// [`HumanTaskNodeError::Suspend`] when the engine refuses the status
    /// change after the task exists. No compensating write is made in that
    /// case; see the variant for what the caller owns.
    pub async fn execute<P>(&mut self, instance: &P) -> Result<TaskId, HumanTaskNodeError>
    where
        P: ProcessInstance + ?Sized,
    {
        if let Some(existing) = self.task_id {
            return Err(HumanTaskNodeError::AlreadyActivated(existing));
        }

        let definition = self.config.apply_to(process_definition(instance));
        let task = self.service.create(definition).await.map_err(|err| {
            error!(
                process_id = %instance.id(),
                task_def_id = %self.config.id,
                error = %err,
                "human task creation failed"
            );
            HumanTaskNodeError::Create(err)
        })?;
        let task_id = task.id();
        self.task_id = Some(task_id);

        instance
            .change_status(ProcessStatus::Waiting)
            .await
            .map_err(|source| {
                warn!(
                    process_id = %instance.id(),
                    task_id = %task_id,
                    error = %source,
                    "human task left live after failed suspension"
                );
                HumanTaskNodeError::Suspend { task_id, source }
            })?;
        debug!(
            process_id = %instance.id(),
            task_id = %task_id,
            "process waiting on human task"
        );
        Ok(task_id)
    }
}
