//! In-memory task store.
//!
//! [`InMemoryTaskStore`] keeps records in a `DashMap` keyed by task id.
//! The conditional write takes the entry's shard lock for the
//! compare-and-swap, so exactly one of any set of concurrent writers
//! presenting the same version commits. There is no domain logic here;
//! guards and transitions live in the engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::domain::{TaskRecord, TaskStatus};
use crate::store::{StoreError, TaskStore};

/// Thread-safe in-memory [`TaskStore`] backed by a [`DashMap`].
///
/// # Examples
///
/// ```
/// use flowdesk_tasks::store::InMemoryTaskStore;
///
/// let store = InMemoryTaskStore::new();
/// assert!(store.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    records: DashMap<String, TaskRecord>,
}

impl InMemoryTaskStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Returns the number of records stored.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, mut record: TaskRecord) -> Result<TaskRecord, StoreError> {
        use dashmap::mapref::entry::Entry;

        record.version = 1;
        match self.records.entry(record.task_id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Backend {
                message: format!("task {} already exists", record.task_id),
            }),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn get(&self, task_id: &str) -> Result<TaskRecord, StoreError> {
        self.records
            .get(task_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound {
                task_id: task_id.to_string(),
            })
    }

    async fn put_if_version(
        &self,
        mut record: TaskRecord,
        expected_version: u64,
    ) -> Result<TaskRecord, StoreError> {
        let mut entry =
            self.records
                .get_mut(&record.task_id)
                .ok_or_else(|| StoreError::NotFound {
                    task_id: record.task_id.clone(),
                })?;

        let current_version = entry.value().version;
        if current_version != expected_version {
            return Err(StoreError::VersionConflict {
                task_id: record.task_id.clone(),
                expected: expected_version,
                actual: current_version,
            });
        }

        record.version = expected_version + 1;
        *entry.value_mut() = record.clone();
        Ok(record)
    }

    async fn query_due(
        &self,
        due_before: DateTime<Utc>,
        statuses: &[TaskStatus],
    ) -> Result<Vec<TaskRecord>, StoreError> {
        let mut due: Vec<TaskRecord> = self
            .records
            .iter()
            .filter(|entry| {
                statuses.contains(&entry.status)
                    && entry.deadline.is_some_and(|d| d <= due_before)
            })
            .map(|entry| entry.value().clone())
            .collect();

        due.sort_by_key(|record| record.deadline);
        Ok(due)
    }
}
