//! `PostgreSQL` repository implementation for human-task storage.

use super::{
    models::{
        HumanTaskChangeset, NewHumanTaskRow, StoredHumanTaskRow, revision_from_column,
        revision_to_column,
    },
    schema::human_tasks,
};
use crate::human_task::{
    domain::{
        HumanTask, HumanTaskStatus, NewHumanTask, ProcessInstanceId, TaskDefId, TaskId, TaskQuery,
    },
    ports::{HumanTaskRepository, TaskRepositoryError, TaskRepositoryResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by human-task adapters.
pub type HumanTaskPgPool = Pool<ConnectionManager<PgConnection>>;

const LIVE_ACTIVATION_INDEX: &str = "idx_human_tasks_live_activation";

const SELECT_BY_CONTAINMENT: &str = concat!(
    "SELECT id, revision, status, record FROM human_tasks ",
    "WHERE record @> $1 ",
    "ORDER BY created_at, id",
);

const SELECT_FIRST_BY_CONTAINMENT: &str = concat!(
    "SELECT id, revision, status, record FROM human_tasks ",
    "WHERE record @> $1 ",
    "ORDER BY created_at, id ",
    "LIMIT 1",
);

/// `PostgreSQL`-backed human-task repository.
///
/// Queries use `jsonb` containment against the `record` column, and updates
/// are guarded by `WHERE revision = <read revision>`.
#[derive(Debug, Clone)]
pub struct PostgresHumanTaskRepository {
    pool: HumanTaskPgPool,
}

impl PostgresHumanTaskRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: HumanTaskPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> TaskRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TaskRepositoryError::persistence)?
    }

    async fn select(
        &self,
        sql: &'static str,
        query: &TaskQuery,
    ) -> TaskRepositoryResult<Vec<HumanTask>> {
        let document = query.to_value();
        self.run_blocking(move |connection| {
            let rows = diesel::sql_query(sql)
                .bind::<diesel::sql_types::Jsonb, _>(document)
                .load::<StoredHumanTaskRow>(connection)
                .map_err(TaskRepositoryError::persistence)?;
            rows.into_iter().map(StoredHumanTaskRow::into_domain).collect()
        })
        .await
    }
}

#[async_trait]
impl HumanTaskRepository for PostgresHumanTaskRepository {
    async fn insert(&self, task: &NewHumanTask) -> TaskRepositoryResult<HumanTask> {
        let stored = HumanTask::from_new(TaskId::new(), task.clone());
        let task_id = stored.id();
        let new_row = NewHumanTaskRow::try_from_domain(&stored)?;
        let activation = stored
            .process_id()
            .cloned()
            .zip(stored.task_def_id().cloned());

        self.run_blocking(move |connection| {
            // Reports the duplicate precisely; the partial unique index still
            // guards the window between this check and the insert.
            if let Some((process_id, task_def_id)) = activation.as_ref() {
                if live_activation_exists(connection, process_id, task_def_id)? {
                    return Err(TaskRepositoryError::DuplicateActivation {
                        process_id: process_id.clone(),
                        task_def_id: task_def_id.clone(),
                    });
                }
            }

            diesel::insert_into(human_tasks::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match (err, activation.as_ref()) {
                    (
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info),
                        Some((process_id, task_def_id)),
                    ) if is_live_activation_violation(info.as_ref()) => {
                        TaskRepositoryError::DuplicateActivation {
                            process_id: process_id.clone(),
                            task_def_id: task_def_id.clone(),
                        }
                    }
                    (DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _), _) => {
                        TaskRepositoryError::DuplicateTask(task_id)
                    }
                    (other, _) => TaskRepositoryError::persistence(other),
                })?;
            Ok(())
        })
        .await?;

        Ok(stored)
    }

    async fn find_one(&self, query: &TaskQuery) -> TaskRepositoryResult<Option<HumanTask>> {
        let found = self.select(SELECT_FIRST_BY_CONTAINMENT, query).await?;
        Ok(found.into_iter().next())
    }

    async fn find(&self, query: &TaskQuery) -> TaskRepositoryResult<Vec<HumanTask>> {
        self.select(SELECT_BY_CONTAINMENT, query).await
    }

    async fn update(&self, task: &HumanTask) -> TaskRepositoryResult<HumanTask> {
        let task_id = task.id();
        let expected = task.revision();
        let written = task.clone().with_revision(expected.next());
        let changeset = HumanTaskChangeset::try_from_domain(&written)?;
        let expected_value = revision_to_column(expected)?;

        self.run_blocking(move |connection| {
            let affected = diesel::update(
                human_tasks::table
                    .filter(human_tasks::id.eq(task_id.into_inner()))
                    .filter(human_tasks::revision.eq(expected_value)),
            )
            .set(&changeset)
            .execute(connection)
            .map_err(TaskRepositoryError::persistence)?;

            if affected > 0 {
                return Ok(());
            }

            let actual = human_tasks::table
                .filter(human_tasks::id.eq(task_id.into_inner()))
                .select(human_tasks::revision)
                .first::<i64>(connection)
                .optional()
                .map_err(TaskRepositoryError::persistence)?;
            match actual {
                None => Err(TaskRepositoryError::NotFound(task_id)),
                Some(actual) => Err(TaskRepositoryError::Conflict {
                    task_id,
                    expected,
                    actual: revision_from_column(actual)?,
                }),
            }
        })
        .await?;

        Ok(written)
    }
}

fn is_live_activation_violation(info: &dyn DatabaseErrorInformation) -> bool {
    info.constraint_name()
        .is_some_and(|name| name == LIVE_ACTIVATION_INDEX)
}

fn live_activation_exists(
    connection: &mut PgConnection,
    process_id: &ProcessInstanceId,
    task_def_id: &TaskDefId,
) -> TaskRepositoryResult<bool> {
    diesel::select(diesel::dsl::exists(
        human_tasks::table
            .filter(human_tasks::process_id.eq(process_id.as_str()))
            .filter(human_tasks::task_def_id.eq(task_def_id.as_str()))
            .filter(human_tasks::status.ne(HumanTaskStatus::Completed.as_str())),
    ))
    .get_result::<bool>(connection)
    .map_err(TaskRepositoryError::persistence)
}
