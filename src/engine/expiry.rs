//! Deadline expiration: the periodic sweep and the on-demand expire.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::{TaskRecord, TaskStatus};
use crate::error::TaskError;
use crate::store::{StoreError, TaskStore};

/// Statuses eligible for deadline expiration.
const EXPIRABLE: [TaskStatus; 2] = [TaskStatus::Pending, TaskStatus::Claimed];

struct SweepHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

/// Marks overdue tasks `Expired`.
///
/// The scheduler is the time-driven actor of the engine: a periodic sweep
/// queries for `Pending`/`Claimed` tasks whose deadline has passed and
/// attempts the transition to `Expired`, keyed on the version the query
/// returned. A conflict means the task changed between read and write
/// (typically a completion landing just in time); that is expected
/// contention and is skipped silently.
///
/// The sweep runs on its own interval, started with [`start`](Self::start)
/// and stopped with [`stop`](Self::stop); its only side channel into the
/// rest of the system is the store's conditional write. The same
/// transition is also reachable on demand through
/// [`expire`](Self::expire), for callers that want a specific overdue
/// task marked without waiting for the next tick.
pub struct ExpirationScheduler {
    store: Arc<dyn TaskStore>,
    interval: Duration,
    sweep: Mutex<Option<SweepHandle>>,
}

impl ExpirationScheduler {
    /// Creates a scheduler that sweeps every `interval`.
    pub fn new(store: Arc<dyn TaskStore>, interval: Duration) -> Self {
        Self {
            store,
            interval,
            sweep: Mutex::new(None),
        }
    }

    /// Starts the periodic sweep. A second call while running is a no-op.
    pub fn start(&self) {
        let mut guard = self.sweep.lock();
        if guard.is_some() {
            return;
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let store = Arc::clone(&self.store);
        let interval = self.interval;
        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick of a tokio interval fires immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = Self::sweep_store(store.as_ref()).await {
                            tracing::warn!(error = %err, "expiration sweep failed");
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        *guard = Some(SweepHandle { shutdown, join });
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "expiration scheduler started");
    }

    /// Stops the periodic sweep and waits for the loop to exit.
    pub async fn stop(&self) {
        let handle = self.sweep.lock().take();
        if let Some(handle) = handle {
            let _ = handle.shutdown.send(true);
            let _ = handle.join.await;
            tracing::info!("expiration scheduler stopped");
        }
    }

    /// Returns `true` if the periodic sweep is running.
    pub fn is_running(&self) -> bool {
        self.sweep.lock().is_some()
    }

    /// Runs one sweep immediately, returning how many tasks were marked
    /// `Expired`. Conflicts with concurrent user action are skipped, not
    /// counted and not reported.
    ///
    /// # Errors
    ///
    /// - [`TaskError::Store`] if the deadline query itself fails.
    pub async fn sweep_once(&self) -> Result<usize, TaskError> {
        Self::sweep_store(self.store.as_ref()).await
    }

    async fn sweep_store(store: &dyn TaskStore) -> Result<usize, TaskError> {
        let now = Utc::now();
        let due = store.query_due(now, &EXPIRABLE).await?;

        let mut expired = 0;
        for record in due {
            let expected_version = record.version;
            let task_id = record.task_id.clone();
            let mut updated = record;
            updated.status = TaskStatus::Expired;

            match store.put_if_version(updated, expected_version).await {
                Ok(_) => {
                    expired += 1;
                    tracing::debug!(task_id = %task_id, "task expired");
                }
                // The task changed between read and write, or was removed.
                // Someone acted on it in time; not an error.
                Err(StoreError::VersionConflict { .. }) | Err(StoreError::NotFound { .. }) => {
                    tracing::debug!(task_id = %task_id, "task changed during sweep, skipped");
                }
                Err(err) => {
                    tracing::warn!(task_id = %task_id, error = %err, "sweep write failed");
                }
            }
        }
        Ok(expired)
    }

    /// Marks one overdue task `Expired` on demand.
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] if no such task exists.
    /// - [`TaskError::Conflict`] on a stale `expected_version`.
    /// - [`TaskError::InvalidState`] unless the task is `Pending` or
    ///   `Claimed`.
    /// - [`TaskError::ExpirationNotDue`] if the deadline has not passed,
    ///   or the task has no deadline at all.
    pub async fn expire(
        &self,
        task_id: &str,
        expected_version: u64,
    ) -> Result<TaskRecord, TaskError> {
        let record = self.store.get(task_id).await?;

        if record.version != expected_version {
            return Err(TaskError::Conflict {
                task_id: task_id.to_string(),
                expected_version,
                actual_version: record.version,
            });
        }
        if !EXPIRABLE.contains(&record.status) {
            return Err(TaskError::InvalidState {
                task_id: task_id.to_string(),
                status: record.status,
                operation: "expire",
            });
        }
        if !record.is_deadline_passed(Utc::now()) {
            return Err(TaskError::ExpirationNotDue {
                task_id: task_id.to_string(),
            });
        }

        let mut updated = record;
        updated.status = TaskStatus::Expired;
        let committed = self.store.put_if_version(updated, expected_version).await?;
        tracing::debug!(task_id = %task_id, "task expired on demand");
        Ok(committed)
    }
}

impl Drop for ExpirationScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.sweep.lock().take() {
            handle.join.abort();
        }
    }
}
