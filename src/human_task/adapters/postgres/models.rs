//! Diesel row models for human-task persistence.

use super::schema::human_tasks;
use crate::human_task::{
    domain::{HumanTask, HumanTaskStatus, Revision, TaskId, TaskRecordError},
    ports::{TaskRepositoryError, TaskRepositoryResult},
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for human-task records.
///
/// The record rebuilds the task. The promoted `status` column is read back
/// too and must agree with it, since the live-activation index filters on it.
#[derive(Debug, Clone, QueryableByName)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StoredHumanTaskRow {
    /// Task identifier.
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    pub id: uuid::Uuid,
    /// Conditional-update token.
    #[diesel(sql_type = diesel::sql_types::Int8)]
    pub revision: i64,
    /// Promoted status column.
    #[diesel(sql_type = diesel::sql_types::Varchar)]
    pub status: String,
    /// Flat task record.
    #[diesel(sql_type = diesel::sql_types::Jsonb)]
    pub record: Value,
}

/// Insert model for human-task records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = human_tasks)]
pub struct NewHumanTaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Initial revision.
    pub revision: i64,
    /// Initial status.
    pub status: String,
    /// Owning process instance, if any.
    pub process_id: Option<String>,
    /// Spawning node definition, if any.
    pub task_def_id: Option<String>,
    /// Flat task record.
    pub record: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Columns rewritten by a conditional update.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = human_tasks)]
pub struct HumanTaskChangeset {
    /// Revision after the write.
    pub revision: i64,
    /// Status after the write.
    pub status: String,
    /// Flat task record after the write.
    pub record: Value,
    /// Modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Converts a revision to its `Int8` column value.
///
/// # Errors
///
/// Returns [`TaskRepositoryError::Persistence`] when the revision exceeds
/// `i64::MAX`.
pub fn revision_to_column(revision: Revision) -> TaskRepositoryResult<i64> {
    i64::try_from(revision.value()).map_err(TaskRepositoryError::persistence)
}

/// Converts an `Int8` column value back to a revision.
///
/// # Errors
///
/// Returns [`TaskRepositoryError::Persistence`] for negative values.
pub fn revision_from_column(value: i64) -> TaskRepositoryResult<Revision> {
    u64::try_from(value)
        .map(Revision::new)
        .map_err(TaskRepositoryError::persistence)
}

impl NewHumanTaskRow {
    /// Builds the insert row for a freshly materialized task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError`] if the task cannot be flattened.
    pub fn try_from_domain(task: &HumanTask) -> TaskRepositoryResult<Self> {
        Ok(Self {
            id: task.id().into_inner(),
            revision: revision_to_column(task.revision())?,
            status: task.status().as_str().to_owned(),
            process_id: task.process_id().map(|id| id.as_str().to_owned()),
            task_def_id: task.task_def_id().map(|id| id.as_str().to_owned()),
            record: Value::Object(task.to_record()?),
            created_at: task.created_time(),
            updated_at: task.modified_time(),
        })
    }
}

impl HumanTaskChangeset {
    /// Builds the changeset that writes `task` as its new state.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError`] if the task cannot be flattened.
    pub fn try_from_domain(task: &HumanTask) -> TaskRepositoryResult<Self> {
        Ok(Self {
            revision: revision_to_column(task.revision())?,
            status: task.status().as_str().to_owned(),
            record: Value::Object(task.to_record()?),
            updated_at: task.modified_time(),
        })
    }
}

impl StoredHumanTaskRow {
    /// Rebuilds the task, taking the revision from its column.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::Record`] when the record is not a valid
    /// task or disagrees with the row's identifier or status, and
    /// [`TaskRepositoryError::Persistence`] when the status column is unknown.
    pub fn into_domain(self) -> TaskRepositoryResult<HumanTask> {
        let status = HumanTaskStatus::try_from(self.status.as_str())
            .map_err(TaskRepositoryError::persistence)?;
        let Value::Object(fields) = self.record else {
            return Err(TaskRecordError::NotAMap.into());
        };
        let task = HumanTask::from_record(fields)?;
        if task.id() != TaskId::from_uuid(self.id) {
            return Err(TaskRecordError::Malformed(format!(
                "record of row {} carries identifier {}",
                self.id,
                task.id()
            ))
            .into());
        }
        if task.status() != status {
            return Err(TaskRecordError::Malformed(format!(
                "row {} has status column {status} but record status {}",
                self.id,
                task.status()
            ))
            .into());
        }
        Ok(task.with_revision(revision_from_column(self.revision)?))
    }
}
