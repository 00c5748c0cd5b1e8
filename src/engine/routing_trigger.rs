//! Default routing of expired tasks.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::TaskStatus;
use crate::error::TaskError;
use crate::routing::RoutingCallback;
use crate::store::{StoreError, TaskStore};

use super::route_or_restore;

/// Forces the final routing decision for an `Expired` task that was never
/// handled.
///
/// `pass_expired` is idempotent under retry and safe under concurrency:
/// the transition to `DefaultRouted` is one conditional write, so of two
/// concurrent invocations exactly one commits and routes. The loser
/// re-reads the task, finds it already `DefaultRouted`, and treats that
/// as success -- the routing side effect happened exactly once.
pub struct DefaultRoutingTrigger {
    store: Arc<dyn TaskStore>,
    routing: Arc<dyn RoutingCallback>,
    default_payload: Value,
}

impl DefaultRoutingTrigger {
    /// Creates a trigger that routes with `default_payload`.
    pub fn new(
        store: Arc<dyn TaskStore>,
        routing: Arc<dyn RoutingCallback>,
        default_payload: Value,
    ) -> Self {
        Self {
            store,
            routing,
            default_payload,
        }
    }

    /// Default-routes one expired task.
    ///
    /// Returns `Ok(())` without touching anything if the task is already
    /// `DefaultRouted` (an earlier or concurrent invocation won).
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] if no such task exists.
    /// - [`TaskError::InvalidState`] if the task is neither `Expired` nor
    ///   already `DefaultRouted`.
    /// - [`TaskError::Conflict`] if the task changed concurrently into a
    ///   state other than `DefaultRouted` (for example a late completion
    ///   landed first); re-read to decide.
    /// - [`TaskError::RoutingFailed`] if the callback failed; the task is
    ///   restored to `Expired` and the call is safe to retry.
    pub async fn pass_expired(&self, task_id: &str) -> Result<(), TaskError> {
        let record = self.store.get(task_id).await?;

        match record.status {
            TaskStatus::Expired => {}
            // Already routed; retrying is success, not an error.
            TaskStatus::DefaultRouted => return Ok(()),
            status => {
                return Err(TaskError::InvalidState {
                    task_id: task_id.to_string(),
                    status,
                    operation: "pass_expired",
                })
            }
        }

        let prior = record.clone();
        let expected_version = record.version;
        let mut updated = record;
        updated.status = TaskStatus::DefaultRouted;

        let committed = match self.store.put_if_version(updated, expected_version).await {
            Ok(committed) => committed,
            Err(StoreError::VersionConflict { .. }) => {
                let current = self.store.get(task_id).await?;
                if current.status == TaskStatus::DefaultRouted {
                    // A concurrent invocation won the race and routed.
                    return Ok(());
                }
                return Err(TaskError::Conflict {
                    task_id: task_id.to_string(),
                    expected_version,
                    actual_version: current.version,
                });
            }
            Err(err) => return Err(err.into()),
        };

        tracing::info!(task_id = %task_id, "expired task default-routed");
        route_or_restore(
            self.store.as_ref(),
            self.routing.as_ref(),
            &committed,
            &prior,
            &self.default_payload,
        )
        .await
        .map(|_| ())
    }
}
