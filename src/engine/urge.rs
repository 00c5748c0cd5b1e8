//! Reminder dispatch for tasks still awaiting action.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{TaskRecord, TaskStatus};
use crate::error::TaskError;
use crate::notify::NotificationDispatcher;
use crate::store::{StoreError, TaskStore};

/// Sends reminders about unhandled tasks.
///
/// Urging touches only the reminder bookkeeping (`urge_count`,
/// `last_urge_time`); it never changes lifecycle state, so it is exempt
/// from the strict version discipline of the transitions. Counter
/// increments commute, which makes it safe to retry the conditional
/// write on contention -- concurrent urges may all succeed.
pub struct UrgeNotifier {
    store: Arc<dyn TaskStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    retry_limit: u32,
}

impl UrgeNotifier {
    /// Creates a notifier with the given CAS retry limit.
    pub fn new(
        store: Arc<dyn TaskStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        retry_limit: u32,
    ) -> Self {
        Self {
            store,
            dispatcher,
            retry_limit,
        }
    }

    /// Records one reminder and triggers its dispatch.
    ///
    /// The reminder reaches the assignee if the task is claimed,
    /// otherwise every candidate. Dispatch is best effort and cannot fail
    /// the operation.
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] if no such task exists.
    /// - [`TaskError::InvalidState`] unless the task is `Pending`,
    ///   `Claimed`, or `Expired`.
    /// - [`TaskError::Conflict`] only if the retry limit is exhausted by
    ///   sustained contention.
    pub async fn urge(&self, task_id: &str) -> Result<TaskRecord, TaskError> {
        let mut attempts = 0;
        loop {
            let record = self.store.get(task_id).await?;

            if !matches!(
                record.status,
                TaskStatus::Pending | TaskStatus::Claimed | TaskStatus::Expired
            ) {
                return Err(TaskError::InvalidState {
                    task_id: task_id.to_string(),
                    status: record.status,
                    operation: "urge",
                });
            }

            let expected_version = record.version;
            let mut updated = record;
            updated.urge_count += 1;
            updated.last_urge_time = Some(Utc::now());

            match self.store.put_if_version(updated, expected_version).await {
                Ok(committed) => {
                    let recipients = committed.urge_recipients();
                    tracing::debug!(
                        task_id = %task_id,
                        urge_count = committed.urge_count,
                        recipients = recipients.len(),
                        "urge dispatched"
                    );
                    self.dispatcher.notify(&recipients, task_id).await;
                    return Ok(committed);
                }
                Err(StoreError::VersionConflict { .. }) if attempts < self.retry_limit => {
                    attempts += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
