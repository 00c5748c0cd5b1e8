//! Claim coordination: resolving grab races among candidates.

use std::sync::Arc;

use crate::domain::{TaskRecord, TaskStatus};
use crate::error::TaskError;
use crate::store::TaskStore;

/// Resolves grab races among the candidates of a shared task.
///
/// A claim is one conditional write against the store, keyed on the
/// version the caller last observed. No lock is taken anywhere: of any
/// number of candidates racing for the same task, exactly one write
/// commits and every other caller observes [`TaskError::Conflict`]. A
/// loser re-reads the task to learn what happened; finding itself as the
/// assignee means its own earlier attempt already won.
pub struct ClaimCoordinator {
    store: Arc<dyn TaskStore>,
}

impl ClaimCoordinator {
    /// Creates a coordinator over the given store.
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Takes exclusive ownership of a task for `person_id`.
    ///
    /// On success the task is `Claimed`, `assignee` is `person_id`, and
    /// the returned snapshot carries the incremented version.
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] if no such task exists.
    /// - [`TaskError::Forbidden`] if `person_id` is not a candidate.
    /// - [`TaskError::Conflict`] if the task was mutated since the caller
    ///   read `expected_version` -- most commonly, someone else already
    ///   claimed it.
    /// - [`TaskError::InvalidState`] if the task is not `Pending`.
    pub async fn claim(
        &self,
        task_id: &str,
        person_id: &str,
        expected_version: u64,
    ) -> Result<TaskRecord, TaskError> {
        let record = self.store.get(task_id).await?;

        if !record.is_candidate(person_id) {
            return Err(TaskError::Forbidden {
                task_id: task_id.to_string(),
                person: person_id.to_string(),
            });
        }
        if record.version != expected_version {
            return Err(TaskError::Conflict {
                task_id: task_id.to_string(),
                expected_version,
                actual_version: record.version,
            });
        }
        if record.status != TaskStatus::Pending {
            return Err(TaskError::InvalidState {
                task_id: task_id.to_string(),
                status: record.status,
                operation: "claim",
            });
        }

        let mut updated = record;
        updated.assignee = Some(person_id.to_string());
        updated.status = TaskStatus::Claimed;

        let committed = self.store.put_if_version(updated, expected_version).await?;
        tracing::debug!(
            task_id = %task_id,
            person = %person_id,
            version = committed.version,
            "task claimed"
        );
        Ok(committed)
    }
}
