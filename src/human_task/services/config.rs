//! Configuration for human-task creation limits.

use crate::human_task::domain::{HumanTaskDomainError, TaskDefinition};
use serde::{Deserialize, Serialize};

/// Limits applied to task definitions before a task is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HumanTaskConfig {
    /// Maximum task name length in characters.
    pub max_name_length: usize,
    /// Maximum number of candidate users per task.
    pub max_candidate_users: usize,
    /// Maximum number of candidate groups per task.
    pub max_candidate_groups: usize,
    /// Whether a task must name an assignee or at least one candidate.
    pub require_candidates: bool,
}

impl Default for HumanTaskConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl HumanTaskConfig {
    /// Default limits, sized to the storage schema.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            max_name_length: 255,
            max_candidate_users: 500,
            max_candidate_groups: 100,
            require_candidates: false,
        }
    }

    /// Creates a lenient configuration with effectively unbounded lists.
    ///
    /// Useful for tests and bulk imports.
    #[must_use]
    pub const fn lenient() -> Self {
        Self {
            max_candidate_users: usize::MAX,
            max_candidate_groups: usize::MAX,
            ..Self::standard()
        }
    }

    /// Creates a strict configuration that also rejects tasks nobody can
    /// claim.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            max_name_length: 120,
            max_candidate_users: 50,
            max_candidate_groups: 20,
            require_candidates: true,
        }
    }

    /// Checks `definition` against these limits.
    ///
    /// # Errors
    ///
    /// Returns the first [`HumanTaskDomainError`] found.
    pub fn check(&self, definition: &TaskDefinition) -> Result<(), HumanTaskDomainError> {
        let name = definition.name().trim();
        if name.is_empty() {
            return Err(HumanTaskDomainError::EmptyTaskName);
        }
        let length = name.chars().count();
        if length > self.max_name_length {
            return Err(HumanTaskDomainError::TaskNameTooLong {
                length,
                max: self.max_name_length,
            });
        }

        let users = definition.candidate_users().len();
        if users > self.max_candidate_users {
            return Err(HumanTaskDomainError::TooManyCandidateUsers {
                count: users,
                max: self.max_candidate_users,
            });
        }
        let groups = definition.candidate_groups().len();
        if groups > self.max_candidate_groups {
            return Err(HumanTaskDomainError::TooManyCandidateGroups {
                count: groups,
                max: self.max_candidate_groups,
            });
        }

        let claimable = definition.assignee().is_some() || users > 0 || groups > 0;
        if self.require_candidates && !claimable {
            return Err(HumanTaskDomainError::MissingCandidates);
        }

        if let Some(process_id) = definition.process_id() {
            if definition.task_def_id().is_none() {
                return Err(HumanTaskDomainError::MissingTaskDefinition(
                    process_id.to_string(),
                ));
            }
        }
        Ok(())
    }
}
