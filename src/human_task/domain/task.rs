//! Human-task entity and its flat storage record.

use super::{
    ActorId, ClaimRejection, GroupId, HumanTaskDomainError, HumanTaskStatus, ProcessDefinitionId,
    ProcessInstanceId, ProcessVariables, Revision, TaskDefId, TaskDefinition, TaskId,
    TaskProperties, TaskRecordError,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat field-name to value map a task is stored as.
pub type TaskRecord = Map<String, Value>;

/// Kind tag carried by every workflow task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    /// A task performed by a human actor.
    #[serde(rename = "human-task")]
    HumanTask,
}

/// Fields shared by every workflow task kind.
///
/// Flattened into the owning task's record so the stored layout stays a
/// single level of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTaskBase {
    #[serde(rename = "type")]
    kind: TaskKind,
    #[serde(default)]
    properties: TaskProperties,
}

impl WorkflowTaskBase {
    /// Creates the base for a task of `kind` with the given properties.
    #[must_use]
    pub const fn new(kind: TaskKind, properties: TaskProperties) -> Self {
        Self { kind, properties }
    }

    /// Returns the task kind.
    #[must_use]
    pub const fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Returns the runtime properties.
    #[must_use]
    pub const fn properties(&self) -> &TaskProperties {
        &self.properties
    }
}

/// A human task that has been built but not yet stored.
///
/// The store assigns the identifier and initial revision on insert via
/// [`HumanTask::from_new`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewHumanTask {
    base: WorkflowTaskBase,
    name: String,
    status: HumanTaskStatus,
    assignee: Option<ActorId>,
    candidate_users: Vec<ActorId>,
    candidate_groups: Vec<GroupId>,
    process_id: Option<ProcessInstanceId>,
    process_name: Option<String>,
    definition_id: Option<ProcessDefinitionId>,
    task_def_id: Option<TaskDefId>,
    process_variables: ProcessVariables,
    created_time: DateTime<Utc>,
    modified_time: DateTime<Utc>,
}

impl NewHumanTask {
    /// Builds an unsaved task from a definition.
    ///
    /// The task starts [`HumanTaskStatus::Reserved`] when the definition names
    /// an assignee and [`HumanTaskStatus::New`] otherwise. Both timestamps are
    /// taken from a single clock reading.
    #[must_use]
    pub fn from_definition(definition: TaskDefinition, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        let status = if definition.assignee().is_some() {
            HumanTaskStatus::Reserved
        } else {
            HumanTaskStatus::New
        };
        let name = definition.name().trim().to_owned();

        Self {
            base: WorkflowTaskBase::new(TaskKind::HumanTask, definition.properties().clone()),
            name,
            status,
            assignee: definition.assignee().cloned(),
            candidate_users: definition.candidate_users().to_vec(),
            candidate_groups: definition.candidate_groups().to_vec(),
            process_id: definition.process_id().cloned(),
            process_name: definition.process_name().map(str::to_owned),
            definition_id: definition.definition_id().cloned(),
            task_def_id: definition.task_def_id().cloned(),
            process_variables: definition.process_variables().clone(),
            created_time: timestamp,
            modified_time: timestamp,
        }
    }

    /// Returns the initial status.
    #[must_use]
    pub const fn status(&self) -> HumanTaskStatus {
        self.status
    }

    /// Returns the owning process instance, if any.
    #[must_use]
    pub const fn process_id(&self) -> Option<&ProcessInstanceId> {
        self.process_id.as_ref()
    }

    /// Returns the spawning node definition, if any.
    #[must_use]
    pub const fn task_def_id(&self) -> Option<&TaskDefId> {
        self.task_def_id.as_ref()
    }
}

/// Result of a claim that the task accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The actor became the assignee.
    Claimed,
    /// The actor already held the task; nothing changed.
    AlreadyHeld,
}

/// Durable record of one human task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HumanTask {
    id: TaskId,
    revision: Revision,
    #[serde(flatten)]
    base: WorkflowTaskBase,
    name: String,
    status: HumanTaskStatus,
    assignee: Option<ActorId>,
    candidate_users: Vec<ActorId>,
    candidate_groups: Vec<GroupId>,
    process_id: Option<ProcessInstanceId>,
    process_name: Option<String>,
    definition_id: Option<ProcessDefinitionId>,
    task_def_id: Option<TaskDefId>,
    process_variables: ProcessVariables,
    created_time: DateTime<Utc>,
    modified_time: DateTime<Utc>,
}

impl HumanTask {
    /// Materializes a stored task from an unsaved one and the identifier the
    /// store assigned to it.
    #[must_use]
    pub fn from_new(id: TaskId, task: NewHumanTask) -> Self {
        let NewHumanTask {
            base,
            name,
            status,
            assignee,
            candidate_users,
            candidate_groups,
            process_id,
            process_name,
            definition_id,
            task_def_id,
            process_variables,
            created_time,
            modified_time,
        } = task;

        Self {
            id,
            revision: Revision::INITIAL,
            base,
            name,
            status,
            assignee,
            candidate_users,
            candidate_groups,
            process_id,
            process_name,
            definition_id,
            task_def_id,
            process_variables,
            created_time,
            modified_time,
        }
    }

    /// Produces the flat record this task is stored as.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRecordError`] if a field fails to serialize.
    pub fn to_record(&self) -> Result<TaskRecord, TaskRecordError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(record)) => Ok(record),
            Ok(_) => Err(TaskRecordError::NotAMap),
            Err(err) => Err(TaskRecordError::Malformed(err.to_string())),
        }
    }

    /// Rebuilds a task from its flat record; the inverse of
    /// [`HumanTask::to_record`].
    ///
    /// # Errors
    ///
    /// Returns [`TaskRecordError::Malformed`] when a field is missing, has the
    /// wrong type, or holds an unknown status or kind.
    pub fn from_record(record: TaskRecord) -> Result<Self, TaskRecordError> {
        serde_json::from_value(Value::Object(record))
            .map_err(|err| TaskRecordError::Malformed(err.to_string()))
    }

    /// Returns this task stamped with `revision`.
    ///
    /// Store adapters call this when a conditional write succeeds.
    #[must_use]
    pub fn with_revision(mut self, revision: Revision) -> Self {
        self.revision = revision;
        self
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the revision this copy was read at.
    #[must_use]
    pub const fn revision(&self) -> Revision {
        self.revision
    }

    /// Returns the shared workflow-task fields.
    #[must_use]
    pub const fn base(&self) -> &WorkflowTaskBase {
        &self.base
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> HumanTaskStatus {
        self.status
    }

    /// Returns the assignee, if any.
    #[must_use]
    pub const fn assignee(&self) -> Option<&ActorId> {
        self.assignee.as_ref()
    }

    /// Returns the candidate users.
    #[must_use]
    pub fn candidate_users(&self) -> &[ActorId] {
        &self.candidate_users
    }

    /// Returns the candidate groups.
    #[must_use]
    pub fn candidate_groups(&self) -> &[GroupId] {
        &self.candidate_groups
    }

    /// Returns the owning process instance, if any.
    #[must_use]
    pub const fn process_id(&self) -> Option<&ProcessInstanceId> {
        self.process_id.as_ref()
    }

    /// Returns the owning process definition's display name, if any.
    #[must_use]
    pub fn process_name(&self) -> Option<&str> {
        self.process_name.as_deref()
    }

    /// Returns the owning process definition identifier, if any.
    #[must_use]
    pub const fn definition_id(&self) -> Option<&ProcessDefinitionId> {
        self.definition_id.as_ref()
    }

    /// Returns the spawning node definition, if any.
    #[must_use]
    pub const fn task_def_id(&self) -> Option<&TaskDefId> {
        self.task_def_id.as_ref()
    }

    /// Returns the process variable snapshot taken at creation.
    #[must_use]
    pub const fn process_variables(&self) -> &ProcessVariables {
        &self.process_variables
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_time(&self) -> DateTime<Utc> {
        self.created_time
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn modified_time(&self) -> DateTime<Utc> {
        self.modified_time
    }

    /// Makes `actor` the sole assignee and moves the task in progress.
    ///
    /// A claim by the current assignee is accepted without change. Completed
    /// tasks and tasks held by someone else refuse every claim.
    pub(crate) fn claim(
        &mut self,
        actor: &ActorId,
        clock: &impl Clock,
    ) -> Result<ClaimOutcome, ClaimRejection> {
        if self.status.is_terminal() {
            return Err(ClaimRejection::TaskCompleted);
        }
        match self.assignee.as_ref() {
            Some(current) if current == actor => return Ok(ClaimOutcome::AlreadyHeld),
            Some(current) => return Err(ClaimRejection::ClaimedByAnotherActor(current.clone())),
            None => {}
        }
        if !self.candidate_users.contains(actor) {
            return Err(ClaimRejection::NotCandidate);
        }

        self.assignee = Some(actor.clone());
        self.status = HumanTaskStatus::InProgress;
        self.touch(clock);
        Ok(ClaimOutcome::Claimed)
    }

    /// Moves the task in progress from any non-terminal status.
    pub(crate) fn start_working(&mut self, clock: &impl Clock) -> Result<(), HumanTaskDomainError> {
        if self.status.is_terminal() {
            return Err(HumanTaskDomainError::TaskCompleted(self.id));
        }
        self.status = HumanTaskStatus::InProgress;
        self.touch(clock);
        Ok(())
    }

    /// Marks the task completed.
    ///
    /// Returns `false` and leaves the task untouched when it was already
    /// completed.
    pub(crate) fn complete(&mut self, clock: &impl Clock) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = HumanTaskStatus::Completed;
        self.touch(clock);
        true
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.modified_time = clock.utc();
    }
}
