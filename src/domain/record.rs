//! The stored task record.
//!
//! [`TaskRecord`] is the persisted representation of one work item. All
//! engine operations read a record, verify their guards against it, and
//! commit a mutated copy through the store's conditional write. The
//! `version` field is the optimistic-concurrency token for those writes.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::status::TaskStatus;
use crate::error::TaskError;

/// One pending work item handed to human participants.
///
/// Created when the process interpreter emits a new activity for people to
/// handle, mutated only through the engine's guarded transitions, and frozen
/// once a terminal status is reached.
///
/// # Construction
///
/// [`TaskRecord::new`] validates the creation invariants (a non-empty
/// candidate set; a deadline, when present, strictly after creation) and
/// generates a `UUIDv4` id. The record carries version `0` until the store
/// accepts it; the store's `insert` assigns version `1`.
///
/// ```
/// use std::collections::BTreeSet;
/// use flowdesk_tasks::TaskRecord;
///
/// let candidates: BTreeSet<String> =
///     ["alice".to_string(), "bob".to_string()].into_iter().collect();
/// let record = TaskRecord::new("job-7", "activity-approve", candidates, None).unwrap();
/// assert!(!record.task_id.is_empty());
/// assert!(record.assignee.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    /// Unique identifier, immutable.
    pub task_id: String,

    /// The owning process instance. Opaque to the engine; handed back to
    /// the routing callback verbatim.
    pub job_id: String,

    /// The process step that produced this task. Opaque, like `job_id`.
    pub activity_ref: String,

    /// Persons eligible to claim the task. Never empty; only ever grows
    /// (candidate append unions, nothing removes).
    pub candidates: BTreeSet<String>,

    /// Exclusive owner once claimed. Always a member of `candidates`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    /// Current lifecycle status.
    pub status: TaskStatus,

    /// When the task was created, immutable.
    pub create_time: DateTime<Utc>,

    /// Instant after which the task is due for expiration. `None` means
    /// the task never expires automatically.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,

    /// Monotonic counter, incremented by the store on every accepted
    /// write. Callers present the version they last observed; a mismatch
    /// rejects the write.
    pub version: u64,

    /// Number of reminders sent for this task.
    pub urge_count: u32,

    /// When the most recent reminder was sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_urge_time: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Creates a new `Pending` record with a generated `UUIDv4` task id.
    ///
    /// # Errors
    ///
    /// - [`TaskError::InvalidTask`] if `candidates` is empty.
    /// - [`TaskError::InvalidTask`] if `deadline` is not strictly after the
    ///   creation instant.
    pub fn new(
        job_id: impl Into<String>,
        activity_ref: impl Into<String>,
        candidates: BTreeSet<String>,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<Self, TaskError> {
        if candidates.is_empty() {
            return Err(TaskError::InvalidTask {
                reason: "candidate set must not be empty".to_string(),
            });
        }

        let create_time = Utc::now();
        if let Some(due) = deadline {
            if due <= create_time {
                return Err(TaskError::InvalidTask {
                    reason: format!("deadline {due} is not after creation time {create_time}"),
                });
            }
        }

        Ok(Self {
            task_id: Uuid::new_v4().to_string(),
            job_id: job_id.into(),
            activity_ref: activity_ref.into(),
            candidates,
            assignee: None,
            status: TaskStatus::Pending,
            create_time,
            deadline,
            version: 0,
            urge_count: 0,
            last_urge_time: None,
        })
    }

    /// Returns `true` if `person` is eligible to claim this task.
    pub fn is_candidate(&self, person: &str) -> bool {
        self.candidates.contains(person)
    }

    /// Returns `true` if the task has a deadline and it has passed.
    ///
    /// A task with no deadline is never due.
    pub fn is_deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|due| due <= now)
    }

    /// Persons a reminder should reach: the assignee when the task is
    /// claimed, otherwise every candidate.
    pub fn urge_recipients(&self) -> Vec<String> {
        match &self.assignee {
            Some(person) => vec![person.clone()],
            None => self.candidates.iter().cloned().collect(),
        }
    }
}
