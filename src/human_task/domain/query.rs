//! Containment predicate over flat task records.
//!
//! A query is itself a partial record. A stored record matches when it
//! contains every field of the query. Scalars compare by equality and nested
//! objects recurse. An array field matches an array of queried elements when
//! it holds every one of them; a bare scalar never matches an array field.
//! These are the semantics of `PostgreSQL`'s `jsonb @>` operator below the
//! top level of a document, so the in-memory and database stores answer the
//! same query identically.

use super::{
    ActorId, GroupId, HumanTask, HumanTaskStatus, ProcessDefinitionId, ProcessInstanceId,
    TaskDefId, TaskId, TaskRecord, TaskRecordError,
};
use serde_json::Value;

/// Read-only predicate used by the lifecycle service's query operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskQuery {
    document: TaskRecord,
}

impl TaskQuery {
    /// Creates a query that matches every record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a caller-supplied partial record as the predicate.
    #[must_use]
    pub const fn from_document(document: TaskRecord) -> Self {
        Self { document }
    }

    /// Creates a query matching the task with the given identifier.
    #[must_use]
    pub fn by_id(id: TaskId) -> Self {
        Self::new().with_field("id", Value::String(id.to_string()))
    }

    /// Restricts matches to tasks in `status`.
    #[must_use]
    pub fn with_status(self, status: HumanTaskStatus) -> Self {
        self.with_field("status", Value::String(status.as_str().to_owned()))
    }

    /// Restricts matches to tasks assigned to `actor`.
    #[must_use]
    pub fn with_assignee(self, actor: &ActorId) -> Self {
        self.with_field("assignee", Value::String(actor.as_str().to_owned()))
    }

    /// Restricts matches to tasks listing `actor` as a candidate user.
    #[must_use]
    pub fn with_candidate_user(self, actor: &ActorId) -> Self {
        self.with_element("candidateUsers", actor.as_str())
    }

    /// Restricts matches to tasks listing `group` as a candidate group.
    #[must_use]
    pub fn with_candidate_group(self, group: &GroupId) -> Self {
        self.with_element("candidateGroups", group.as_str())
    }

    /// Restricts matches to tasks owned by `process_id`.
    #[must_use]
    pub fn with_process(self, process_id: &ProcessInstanceId) -> Self {
        self.with_field("processId", Value::String(process_id.as_str().to_owned()))
    }

    /// Restricts matches to tasks spawned by the node `task_def_id`.
    #[must_use]
    pub fn with_task_def(self, task_def_id: &TaskDefId) -> Self {
        self.with_field("taskDefId", Value::String(task_def_id.as_str().to_owned()))
    }

    /// Restricts matches to tasks of the process definition `definition_id`.
    #[must_use]
    pub fn with_definition(self, definition_id: &ProcessDefinitionId) -> Self {
        self.with_field(
            "definitionId",
            Value::String(definition_id.as_str().to_owned()),
        )
    }

    /// Returns the predicate as a partial record.
    #[must_use]
    pub const fn document(&self) -> &TaskRecord {
        &self.document
    }

    /// Returns the predicate as a JSON object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.document.clone())
    }

    /// Returns `true` when `record` contains every field of this query.
    #[must_use]
    pub fn matches_record(&self, record: &TaskRecord) -> bool {
        self.document
            .iter()
            .all(|(field, expected)| record.get(field).is_some_and(|v| contains(v, expected)))
    }

    /// Returns `true` when `task` satisfies this query.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRecordError`] if the task cannot be flattened.
    pub fn matches(&self, task: &HumanTask) -> Result<bool, TaskRecordError> {
        Ok(self.matches_record(&task.to_record()?))
    }

    /// Returns the identifier when this query selects nothing but one task id.
    ///
    /// Only the canonical hyphenated form counts, since any other spelling
    /// never equals a stored `id` field.
    pub(crate) fn sole_task_id(&self) -> Option<TaskId> {
        let mut fields = self.document.iter();
        let (Some((field, Value::String(raw))), None) = (fields.next(), fields.next()) else {
            return None;
        };
        if field != "id" {
            return None;
        }
        let uuid = uuid::Uuid::parse_str(raw).ok()?;
        (uuid.hyphenated().to_string() == *raw).then(|| TaskId::from_uuid(uuid))
    }

    fn with_field(mut self, field: &str, value: Value) -> Self {
        self.document.insert(field.to_owned(), value);
        self
    }

    fn with_element(mut self, field: &str, element: &str) -> Self {
        let entry = self
            .document
            .entry(field.to_owned())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(elements) = entry {
            elements.push(Value::String(element.to_owned()));
        } else {
            *entry = Value::Array(vec![Value::String(element.to_owned())]);
        }
        self
    }
}

/// `jsonb @>` containment.
fn contains(stored: &Value, expected: &Value) -> bool {
    match (stored, expected) {
        (Value::Object(stored_fields), Value::Object(expected_fields)) => {
            expected_fields.iter().all(|(field, value)| {
                stored_fields
                    .get(field)
                    .is_some_and(|stored_value| contains(stored_value, value))
            })
        }
        (Value::Array(stored_items), Value::Array(expected_items)) => {
            expected_items.iter().all(|expected_item| {
                stored_items
                    .iter()
                    .any(|stored_item| contains(stored_item, expected_item))
            })
        }
        _ => stored == expected,
    }
}
