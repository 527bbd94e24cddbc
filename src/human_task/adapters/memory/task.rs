//! In-memory repository for human tasks.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::human_task::{
    domain::{HumanTask, NewHumanTask, ProcessInstanceId, TaskDefId, TaskId, TaskQuery},
    ports::{HumanTaskRepository, TaskRepositoryError, TaskRepositoryResult},
};

type ActivationKey = (ProcessInstanceId, TaskDefId);

/// Thread-safe in-memory human-task repository.
///
/// The revision check and the write of [`HumanTaskRepository::update`] run
/// under one write lock, which makes the update conditional.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHumanTaskRepository {
    state: Arc<RwLock<InMemoryTaskState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: HashMap<TaskId, HumanTask>,
    live_activations: HashMap<ActivationKey, TaskId>,
}

impl InMemoryHumanTaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored tasks.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::Persistence`] if the lock is poisoned.
    pub fn len(&self) -> TaskRepositoryResult<usize> {
        Ok(self.read()?.tasks.len())
    }

    /// Returns `true` when nothing has been stored.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::Persistence`] if the lock is poisoned.
    pub fn is_empty(&self) -> TaskRepositoryResult<bool> {
        Ok(self.read()?.tasks.is_empty())
    }

    fn read(&self) -> TaskRepositoryResult<RwLockReadGuard<'_, InMemoryTaskState>> {
        self.state.read().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> TaskRepositoryResult<RwLockWriteGuard<'_, InMemoryTaskState>> {
        self.state.write().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

fn activation_key(
    process_id: Option<&ProcessInstanceId>,
    task_def_id: Option<&TaskDefId>,
) -> Option<ActivationKey> {
    Some((process_id?.clone(), task_def_id?.clone()))
}

/// Collects matching tasks, oldest first.
///
/// A bare identifier query is a direct map lookup.
fn matching_tasks(
    state: &InMemoryTaskState,
    query: &TaskQuery,
) -> TaskRepositoryResult<Vec<HumanTask>> {
    if let Some(task_id) = query.sole_task_id() {
        return Ok(state.tasks.get(&task_id).cloned().into_iter().collect());
    }

    let mut found = Vec::new();
    for task in state.tasks.values() {
        if query.matches(task)? {
            found.push(task.clone());
        }
    }
    found.sort_by_key(|task| (task.created_time(), task.id()));
    Ok(found)
}

#[async_trait]
impl HumanTaskRepository for InMemoryHumanTaskRepository {
    async fn insert(&self, task: &NewHumanTask) -> TaskRepositoryResult<HumanTask> {
        let mut state = self.write()?;
        let task_id = TaskId::new();
        if state.tasks.contains_key(&task_id) {
            return Err(TaskRepositoryError::DuplicateTask(task_id));
        }

        let key = activation_key(task.process_id(), task.task_def_id());
        if let Some(activation) = key.as_ref() {
            if state.live_activations.contains_key(activation) {
                let (process_id, task_def_id) = activation.clone();
                return Err(TaskRepositoryError::DuplicateActivation {
                    process_id,
                    task_def_id,
                });
            }
        }

        let stored = HumanTask::from_new(task_id, task.clone());
        if let Some(activation) = key {
            if !stored.status().is_terminal() {
                state.live_activations.insert(activation, task_id);
            }
        }
        state.tasks.insert(task_id, stored.clone());
        Ok(stored)
    }

    async fn find_one(&self, query: &TaskQuery) -> TaskRepositoryResult<Option<HumanTask>> {
        let state = self.read()?;
        Ok(matching_tasks(&state, query)?.into_iter().next())
    }

    async fn find(&self, query: &TaskQuery) -> TaskRepositoryResult<Vec<HumanTask>> {
        let state = self.read()?;
        matching_tasks(&state, query)
    }

    async fn update(&self, task: &HumanTask) -> TaskRepositoryResult<HumanTask> {
        let mut state = self.write()?;
        let task_id = task.id();
        let stored_revision = state
            .tasks
            .get(&task_id)
            .ok_or(TaskRepositoryError::NotFound(task_id))?
            .revision();
        if stored_revision != task.revision() {
            return Err(TaskRepositoryError::Conflict {
                task_id,
                expected: task.revision(),
                actual: stored_revision,
            });
        }

        let written = task.clone().with_revision(stored_revision.next());
        if written.status().is_terminal() {
            if let Some(key) = activation_key(written.process_id(), written.task_def_id()) {
                if state.live_activations.get(&key) == Some(&task_id) {
                    state.live_activations.remove(&key);
                }
            }
        }
        state.tasks.insert(task_id, written.clone());
        Ok(written)
    }
}
