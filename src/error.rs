//! Error types for task lifecycle operations.
//!
//! [`TaskError`] is the single error surface exposed to callers. Each
//! variant carries the context (task id, status, versions) needed to decide
//! whether to re-read and retry or to give up. Low-level storage failures
//! ([`StoreError`](crate::store::StoreError)) are mapped into this type at
//! the engine boundary via the `From` impl below.

use thiserror::Error;

use crate::domain::TaskStatus;
use crate::store::StoreError;

/// Errors produced by task lifecycle operations.
///
/// # Examples
///
/// ```
/// use flowdesk_tasks::TaskError;
///
/// let err = TaskError::NotFound { task_id: "missing-task".to_string() };
/// assert!(err.to_string().contains("missing-task"));
/// assert!(!err.is_retryable());
/// ```
#[derive(Debug, Error)]
pub enum TaskError {
    /// No task with the given id exists.
    #[error("task not found: {task_id}")]
    NotFound {
        /// The task id that was not found.
        task_id: String,
    },

    /// The acting person is not authorized for this task.
    #[error("person {person} may not act on task {task_id}")]
    Forbidden {
        /// The task the person tried to act on.
        task_id: String,
        /// The person that was rejected.
        person: String,
    },

    /// The operation is not valid in the task's current status.
    #[error("{operation} is not allowed for task {task_id} in status {status}")]
    InvalidState {
        /// The task that was being operated on.
        task_id: String,
        /// The task's current status.
        status: TaskStatus,
        /// The operation that was rejected.
        operation: &'static str,
    },

    /// The task was mutated concurrently: the stored version no longer
    /// matches the version the caller last observed. Re-read and retry.
    #[error("version conflict on task {task_id}: expected {expected_version}, found {actual_version}")]
    Conflict {
        /// The task where the conflict occurred.
        task_id: String,
        /// The version the caller presented.
        expected_version: u64,
        /// The version actually stored.
        actual_version: u64,
    },

    /// The external routing callback failed. The task was left in its
    /// pre-operation state and the operation is safe to retry.
    #[error("routing failed for task {task_id}: {message}")]
    RoutingFailed {
        /// The task whose routing failed.
        task_id: String,
        /// The callback's failure message.
        message: String,
    },

    /// An explicit expire request arrived before the task's deadline,
    /// or the task has no deadline at all.
    #[error("task {task_id} is not past its deadline")]
    ExpirationNotDue {
        /// The task that is not yet due.
        task_id: String,
    },

    /// A task descriptor violated a creation invariant.
    #[error("invalid task: {reason}")]
    InvalidTask {
        /// What was wrong with the descriptor.
        reason: String,
    },

    /// Backend storage error.
    #[error("store error: {0}")]
    Store(String),
}

impl TaskError {
    /// Returns `true` if the failed operation may succeed when retried.
    ///
    /// `Conflict` callers should re-read the task and retry against the
    /// fresh version; `RoutingFailed` leaves the task actionable, so the
    /// same call can simply be repeated.
    ///
    /// # Examples
    ///
    /// ```
    /// use flowdesk_tasks::TaskError;
    ///
    /// let err = TaskError::Conflict {
    ///     task_id: "t1".to_string(),
    ///     expected_version: 2,
    ///     actual_version: 3,
    /// };
    /// assert!(err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::RoutingFailed { .. })
    }
}

impl From<StoreError> for TaskError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { task_id } => Self::NotFound { task_id },
            StoreError::VersionConflict {
                task_id,
                expected,
                actual,
            } => Self::Conflict {
                task_id,
                expected_version: expected,
                actual_version: actual,
            },
            StoreError::Backend { message } => Self::Store(message),
        }
    }
}
