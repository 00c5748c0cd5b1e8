//! Guarded lifecycle transitions: processing, reset, append, delete.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::{TaskRecord, TaskStatus};
use crate::error::TaskError;
use crate::routing::{RoutingCallback, RoutingOutcome};
use crate::store::TaskStore;

use super::route_or_restore;

/// Implements the four request-driven transitions on a task.
///
/// Every operation follows one discipline: read the current record, verify
/// the guards against it, commit a single conditional write keyed on the
/// caller's last-observed version. A guard failure or version mismatch is
/// reported as a typed error and the store is left unchanged.
pub struct LifecycleManager {
    store: Arc<dyn TaskStore>,
    routing: Arc<dyn RoutingCallback>,
}

impl LifecycleManager {
    /// Creates a manager over the given store and routing callback.
    pub fn new(store: Arc<dyn TaskStore>, routing: Arc<dyn RoutingCallback>) -> Self {
        Self { store, routing }
    }

    /// Completes a task and hands the process off to the routing callback.
    ///
    /// Allowed from `Pending` (any candidate; acts as an implicit
    /// claim-then-complete), `Claimed` (the assignee only), and `Expired`
    /// (a late completion, honored as long as the default-routing sweep
    /// has not committed first; the assignee when one is set, otherwise
    /// any candidate).
    ///
    /// The conditional write to `Processed` commits first and decides any
    /// race; the callback runs after it. If the callback fails, the
    /// task's previous state is restored and the failure is reported as
    /// [`TaskError::RoutingFailed`], leaving the task actionable for
    /// retry.
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] if no such task exists.
    /// - [`TaskError::Conflict`] if the task was mutated since the caller
    ///   read `expected_version`.
    /// - [`TaskError::InvalidState`] if the task is already terminal.
    /// - [`TaskError::Forbidden`] if the caller fails the status-specific
    ///   ownership check above.
    /// - [`TaskError::RoutingFailed`] if the callback failed; the task
    ///   keeps its pre-operation state.
    pub async fn processing(
        &self,
        task_id: &str,
        caller_id: &str,
        expected_version: u64,
        payload: &Value,
    ) -> Result<RoutingOutcome, TaskError> {
        let record = self.store.get(task_id).await?;

        if record.version != expected_version {
            return Err(TaskError::Conflict {
                task_id: task_id.to_string(),
                expected_version,
                actual_version: record.version,
            });
        }

        let authorized = match record.status {
            TaskStatus::Pending => record.is_candidate(caller_id),
            TaskStatus::Claimed => record.assignee.as_deref() == Some(caller_id),
            TaskStatus::Expired => match record.assignee.as_deref() {
                Some(assignee) => assignee == caller_id,
                None => record.is_candidate(caller_id),
            },
            _ => {
                return Err(TaskError::InvalidState {
                    task_id: task_id.to_string(),
                    status: record.status,
                    operation: "processing",
                })
            }
        };
        if !authorized {
            return Err(TaskError::Forbidden {
                task_id: task_id.to_string(),
                person: caller_id.to_string(),
            });
        }

        let prior = record.clone();
        let mut updated = record;
        updated.status = TaskStatus::Processed;
        if updated.assignee.is_none() {
            // Completing straight from Pending (or an unclaimed Expired)
            // records who handled the task.
            updated.assignee = Some(caller_id.to_string());
        }

        let committed = self.store.put_if_version(updated, expected_version).await?;
        tracing::debug!(
            task_id = %task_id,
            caller = %caller_id,
            from = %prior.status,
            "task processed"
        );
        route_or_restore(
            self.store.as_ref(),
            self.routing.as_ref(),
            &committed,
            &prior,
            payload,
        )
        .await
    }

    /// Reassigns a task to `new_assignee` and returns it to `Pending`,
    /// relinquishing any existing claim. The deadline is untouched.
    ///
    /// This is an administrative correction; the caller is not required
    /// to be a candidate, but the new assignee is.
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] if no such task exists.
    /// - [`TaskError::Forbidden`] if `new_assignee` is not a candidate.
    /// - [`TaskError::Conflict`] on a stale `expected_version`.
    /// - [`TaskError::InvalidState`] unless the task is `Pending`,
    ///   `Claimed`, or `Expired`.
    pub async fn reset(
        &self,
        task_id: &str,
        caller_id: &str,
        expected_version: u64,
        new_assignee: &str,
    ) -> Result<TaskRecord, TaskError> {
        let record = self.store.get(task_id).await?;

        if !record.is_candidate(new_assignee) {
            return Err(TaskError::Forbidden {
                task_id: task_id.to_string(),
                person: new_assignee.to_string(),
            });
        }
        if record.version != expected_version {
            return Err(TaskError::Conflict {
                task_id: task_id.to_string(),
                expected_version,
                actual_version: record.version,
            });
        }
        if !matches!(
            record.status,
            TaskStatus::Pending | TaskStatus::Claimed | TaskStatus::Expired
        ) {
            return Err(TaskError::InvalidState {
                task_id: task_id.to_string(),
                status: record.status,
                operation: "reset",
            });
        }

        let mut updated = record;
        updated.assignee = Some(new_assignee.to_string());
        updated.status = TaskStatus::Pending;

        let committed = self.store.put_if_version(updated, expected_version).await?;
        tracing::info!(
            task_id = %task_id,
            caller = %caller_id,
            new_assignee = %new_assignee,
            "task reset"
        );
        Ok(committed)
    }

    /// Unions `extra_candidates` into the task's candidate set.
    ///
    /// Only a `Pending` task can gain candidates; once claimed or closed,
    /// ownership is already resolved.
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] if no such task exists.
    /// - [`TaskError::Conflict`] on a stale `expected_version`.
    /// - [`TaskError::InvalidState`] if the task is not `Pending`.
    pub async fn append(
        &self,
        task_id: &str,
        caller_id: &str,
        expected_version: u64,
        extra_candidates: Vec<String>,
    ) -> Result<TaskRecord, TaskError> {
        let record = self.store.get(task_id).await?;

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
                operation: "append",
            });
        }

        let mut updated = record;
        updated.candidates.extend(extra_candidates);

        let committed = self.store.put_if_version(updated, expected_version).await?;
        tracing::info!(
            task_id = %task_id,
            caller = %caller_id,
            candidates = committed.candidates.len(),
            "candidates appended"
        );
        Ok(committed)
    }

    /// Administratively withdraws a task without advancing the process.
    ///
    /// Permitted from any non-terminal status. The routing callback is
    /// deliberately not invoked: delete discards the work item, it does
    /// not complete it.
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] if no such task exists.
    /// - [`TaskError::Conflict`] on a stale `expected_version`.
    /// - [`TaskError::InvalidState`] if the task is already terminal.
    pub async fn delete(
        &self,
        task_id: &str,
        caller_id: &str,
        expected_version: u64,
    ) -> Result<(), TaskError> {
        let record = self.store.get(task_id).await?;

        if record.version != expected_version {
            return Err(TaskError::Conflict {
                task_id: task_id.to_string(),
                expected_version,
                actual_version: record.version,
            });
        }
        if record.status.is_terminal() {
            return Err(TaskError::InvalidState {
                task_id: task_id.to_string(),
                status: record.status,
                operation: "delete",
            });
        }

        let mut updated = record;
        updated.status = TaskStatus::Deleted;

        self.store.put_if_version(updated, expected_version).await?;
        tracing::info!(task_id = %task_id, caller = %caller_id, "task deleted");
        Ok(())
    }
}
