//! Durable storage contract for task records.
//!
//! The engine talks to persistence exclusively through [`TaskStore`]: a
//! read by id, a deadline range query for the expiration sweep, and a
//! conditional write keyed on the record's version. The conditional write
//! is the single serialization point of the whole engine -- for a given
//! task, concurrent transitions are totally ordered by which write commits
//! first, and there is no other shared mutable state.
//!
//! [`InMemoryTaskStore`](memory::InMemoryTaskStore) is the bundled
//! implementation, suitable for tests and single-process deployments.
//! Production deployments implement [`TaskStore`] over their database's
//! compare-and-swap primitive.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use memory::InMemoryTaskStore;

use crate::domain::{TaskRecord, TaskStatus};

/// Errors from raw storage operations.
///
/// These are mapped into [`TaskError`](crate::error::TaskError) at the
/// engine boundary; callers of the engine never see this type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists for the given task id.
    #[error("no record for task {task_id}")]
    NotFound {
        /// The task id that was not found.
        task_id: String,
    },

    /// A conditional write failed because the stored version does not
    /// match the expected version.
    #[error("version conflict on task {task_id}: expected {expected}, found {actual}")]
    VersionConflict {
        /// The task where the conflict occurred.
        task_id: String,
        /// The version the caller expected.
        expected: u64,
        /// The version actually stored.
        actual: u64,
    },

    /// An I/O or backend-specific failure.
    #[error("backend error: {message}")]
    Backend {
        /// Human-readable description of the failure.
        message: String,
    },
}

/// Storage contract for task records.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; many request handlers and the
/// expiration sweep act on the store concurrently.
///
/// # Versioning
///
/// Every stored record carries a monotonic `u64` version starting at 1 on
/// insert. [`put_if_version`](TaskStore::put_if_version) provides the
/// compare-and-swap primitive: the write commits only when the stored
/// version equals the expected version, and the committed record carries
/// `expected_version + 1`. Implementations never accept a write through
/// any other path.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts a freshly created record, assigning it version 1.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Backend`] if a record with the same id already
    ///   exists, or on I/O failure.
    async fn insert(&self, record: TaskRecord) -> Result<TaskRecord, StoreError>;

    /// Retrieves the current record for a task.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if no record exists for the id.
    /// - [`StoreError::Backend`] on I/O failure.
    async fn get(&self, task_id: &str) -> Result<TaskRecord, StoreError>;

    /// Commits `record` only if the stored version equals
    /// `expected_version`; on success the stored (and returned) record
    /// carries `expected_version + 1`.
    ///
    /// Exactly one of any set of concurrent writers presenting the same
    /// expected version succeeds; the rest observe `VersionConflict`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if no record exists for the id.
    /// - [`StoreError::VersionConflict`] if the stored version differs
    ///   from `expected_version`.
    /// - [`StoreError::Backend`] on I/O failure.
    async fn put_if_version(
        &self,
        record: TaskRecord,
        expected_version: u64,
    ) -> Result<TaskRecord, StoreError>;

    /// Returns the records in any of `statuses` whose deadline is set and
    /// at or before `due_before`, ordered by deadline.
    ///
    /// The result is a finite snapshot; the expiration sweep re-runs the
    /// query on every tick rather than holding a cursor open.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Backend`] on I/O failure.
    async fn query_due(
        &self,
        due_before: DateTime<Utc>,
        statuses: &[TaskStatus],
    ) -> Result<Vec<TaskRecord>, StoreError>;
}
