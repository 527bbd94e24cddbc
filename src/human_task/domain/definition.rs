//! Task definition consumed by the lifecycle service's create operation.

use super::{ActorId, GroupId, ProcessDefinitionId, ProcessInstanceId, TaskDefId};
use serde_json::{Map, Value};

/// Snapshot of a process instance's variables.
pub type ProcessVariables = Map<String, Value>;

/// Free-form runtime properties authored on a task node definition.
pub type TaskProperties = Map<String, Value>;

/// Everything needed to create one human task.
///
/// Built by the execution node from the owning process instance and the
/// node's static configuration, or directly by trusted callers creating a
/// standalone task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDefinition {
    task_def_id: Option<TaskDefId>,
    name: String,
    assignee: Option<ActorId>,
    candidate_users: Vec<ActorId>,
    candidate_groups: Vec<GroupId>,
    process_id: Option<ProcessInstanceId>,
    process_name: Option<String>,
    definition_id: Option<ProcessDefinitionId>,
    process_variables: ProcessVariables,
    properties: TaskProperties,
}

impl TaskDefinition {
    /// Creates a standalone definition with the given display name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the node definition identifier.
    #[must_use]
    pub fn with_task_def_id(mut self, task_def_id: TaskDefId) -> Self {
        self.task_def_id = Some(task_def_id);
        self
    }

    /// Sets a fixed assignee; the task starts out reserved.
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

    /// Links the task to its owning process instance.
    #[must_use]
    pub fn with_process_id(mut self, process_id: ProcessInstanceId) -> Self {
        self.process_id = Some(process_id);
        self
    }

    /// Sets the owning process definition's display name.
    #[must_use]
    pub fn with_process_name(mut self, process_name: impl Into<String>) -> Self {
        self.process_name = Some(process_name.into());
        self
    }

    /// Sets the owning process definition identifier.
    #[must_use]
    pub fn with_definition_id(mut self, definition_id: ProcessDefinitionId) -> Self {
        self.definition_id = Some(definition_id);
        self
    }

    /// Sets the process variable snapshot.
    #[must_use]
    pub fn with_process_variables(mut self, variables: ProcessVariables) -> Self {
        self.process_variables = variables;
        self
    }

    /// Merges runtime properties; incoming keys replace existing ones.
    #[must_use]
    pub fn with_properties(mut self, properties: TaskProperties) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Returns the node definition identifier, if any.
    #[must_use]
    pub const fn task_def_id(&self) -> Option<&TaskDefId> {
        self.task_def_id.as_ref()
    }

    /// Returns the display name as given.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the fixed assignee, if any.
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

    /// Returns the process variable snapshot.
    #[must_use]
    pub const fn process_variables(&self) -> &ProcessVariables {
        &self.process_variables
    }

    /// Returns the runtime properties.
    #[must_use]
    pub const fn properties(&self) -> &TaskProperties {
        &self.properties
    }
}
