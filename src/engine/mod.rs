//! The task lifecycle engine.
//!
//! Five actors cooperate over one shared [`TaskStore`]:
//!
//! - [`ClaimCoordinator`] resolves grab races among candidates.
//! - [`LifecycleManager`] implements processing, reset, append, delete.
//! - [`ExpirationScheduler`] marks overdue tasks `Expired`, periodically
//!   or on demand.
//! - [`DefaultRoutingTrigger`] default-routes expired tasks that nobody
//!   handled.
//! - [`UrgeNotifier`] sends reminders without changing lifecycle state.
//!
//! Each can be constructed standalone; [`TaskEngine`] wires all five over
//! one store, one routing callback, and one notification dispatcher, and
//! is the usual entry point.
//!
//! # Commit Ordering
//!
//! The store's conditional write is the only serialization point. For the
//! two operations that also invoke the routing callback (processing and
//! `pass_expired`), the write commits *first* -- it is the linearization
//! point that decides every race, which is what keeps the callback from
//! firing twice when two actors contend for the same task. The callback
//! runs second; if it fails, a compensating write restores the previous
//! state and the operation reports
//! [`TaskError::RoutingFailed`](crate::error::TaskError::RoutingFailed),
//! leaving the task actionable for retry.

mod claim;
mod expiry;
mod lifecycle;
mod routing_trigger;
mod urge;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

pub use claim::ClaimCoordinator;
pub use expiry::ExpirationScheduler;
pub use lifecycle::LifecycleManager;
pub use routing_trigger::DefaultRoutingTrigger;
pub use urge::UrgeNotifier;

use crate::config::EngineConfig;
use crate::domain::TaskRecord;
use crate::error::TaskError;
use crate::notify::NotificationDispatcher;
use crate::routing::{RoutingCallback, RoutingOutcome};
use crate::store::TaskStore;

/// Invokes the routing callback for a just-committed transition and rolls
/// the record back if the callback fails.
///
/// `committed` is the record as stored after the transition; `prior` is
/// the pre-operation record used for the compensating write. The rollback
/// is keyed on the committed version, so a concurrent writer cannot be
/// clobbered; if even the rollback conflicts, the mismatch is logged and
/// the routing failure is still what the caller sees.
pub(crate) async fn route_or_restore(
    store: &dyn TaskStore,
    routing: &dyn RoutingCallback,
    committed: &TaskRecord,
    prior: &TaskRecord,
    payload: &Value,
) -> Result<RoutingOutcome, TaskError> {
    match routing
        .route(&committed.job_id, &committed.activity_ref, payload)
        .await
    {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            if let Err(restore_err) = store
                .put_if_version(prior.clone(), committed.version)
                .await
            {
                tracing::error!(
                    task_id = %committed.task_id,
                    error = %restore_err,
                    "failed to restore task after routing failure"
                );
            }
            Err(TaskError::RoutingFailed {
                task_id: committed.task_id.clone(),
                message: err.to_string(),
            })
        }
    }
}

/// The assembled task lifecycle engine.
///
/// Owns one instance of each actor, all sharing the same store, routing
/// callback, and notification dispatcher. Methods delegate to the
/// corresponding actor; see each actor's documentation for the guards and
/// error conditions.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use flowdesk_tasks::{EngineConfig, TaskEngine};
/// use flowdesk_tasks::store::InMemoryTaskStore;
/// # use flowdesk_tasks::routing::{RoutingCallback, RoutingError, RoutingOutcome};
/// # use flowdesk_tasks::notify::NotificationDispatcher;
/// # use async_trait::async_trait;
/// # struct Interpreter;
/// # #[async_trait]
/// # impl RoutingCallback for Interpreter {
/// #     async fn route(&self, _: &str, _: &str, _: &serde_json::Value)
/// #         -> Result<RoutingOutcome, RoutingError> { Ok(RoutingOutcome::Completed) }
/// # }
/// # struct Mailer;
/// # #[async_trait]
/// # impl NotificationDispatcher for Mailer {
/// #     async fn notify(&self, _: &[String], _: &str) {}
/// # }
///
/// let engine = TaskEngine::new(
///     Arc::new(InMemoryTaskStore::new()),
///     Arc::new(Interpreter),
///     Arc::new(Mailer),
/// );
/// engine.scheduler().start();
/// ```
pub struct TaskEngine {
    store: Arc<dyn TaskStore>,
    claims: ClaimCoordinator,
    lifecycle: LifecycleManager,
    scheduler: ExpirationScheduler,
    routing_trigger: DefaultRoutingTrigger,
    urger: UrgeNotifier,
}

impl TaskEngine {
    /// Assembles an engine with the default configuration.
    pub fn new(
        store: Arc<dyn TaskStore>,
        routing: Arc<dyn RoutingCallback>,
        notifications: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self::with_config(store, routing, notifications, EngineConfig::default())
    }

    /// Assembles an engine with an explicit configuration.
    pub fn with_config(
        store: Arc<dyn TaskStore>,
        routing: Arc<dyn RoutingCallback>,
        notifications: Arc<dyn NotificationDispatcher>,
        config: EngineConfig,
    ) -> Self {
        Self {
            claims: ClaimCoordinator::new(Arc::clone(&store)),
            lifecycle: LifecycleManager::new(Arc::clone(&store), Arc::clone(&routing)),
            scheduler: ExpirationScheduler::new(Arc::clone(&store), config.sweep_interval),
            routing_trigger: DefaultRoutingTrigger::new(
                Arc::clone(&store),
                routing,
                config.default_route_payload,
            ),
            urger: UrgeNotifier::new(
                Arc::clone(&store),
                notifications,
                config.urge_retry_limit,
            ),
            store,
        }
    }

    /// Creates and stores a new `Pending` task, returning the stored
    /// snapshot (version 1).
    ///
    /// # Errors
    ///
    /// - [`TaskError::InvalidTask`] if the descriptor violates a creation
    ///   invariant (empty candidates, deadline not in the future).
    /// - [`TaskError::Store`] on backend failure.
    pub async fn create(
        &self,
        job_id: impl Into<String>,
        activity_ref: impl Into<String>,
        candidates: BTreeSet<String>,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<TaskRecord, TaskError> {
        let record = TaskRecord::new(job_id, activity_ref, candidates, deadline)?;
        Ok(self.store.insert(record).await?)
    }

    /// Returns the current snapshot of a task.
    ///
    /// Callers that received [`TaskError::Conflict`] re-read through this
    /// to decide whether to retry.
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] if no such task exists.
    pub async fn get(&self, task_id: &str) -> Result<TaskRecord, TaskError> {
        Ok(self.store.get(task_id).await?)
    }

    /// See [`ClaimCoordinator::claim`].
    pub async fn claim(
        &self,
        task_id: &str,
        person_id: &str,
        expected_version: u64,
    ) -> Result<TaskRecord, TaskError> {
        self.claims.claim(task_id, person_id, expected_version).await
    }

    /// See [`LifecycleManager::processing`].
    pub async fn processing(
        &self,
        task_id: &str,
        caller_id: &str,
        expected_version: u64,
        payload: &Value,
    ) -> Result<RoutingOutcome, TaskError> {
        self.lifecycle
            .processing(task_id, caller_id, expected_version, payload)
            .await
    }

    /// See [`LifecycleManager::reset`].
    pub async fn reset(
        &self,
        task_id: &str,
        caller_id: &str,
        expected_version: u64,
        new_assignee: &str,
    ) -> Result<TaskRecord, TaskError> {
        self.lifecycle
            .reset(task_id, caller_id, expected_version, new_assignee)
            .await
    }

    /// See [`LifecycleManager::append`].
    pub async fn append(
        &self,
        task_id: &str,
        caller_id: &str,
        expected_version: u64,
        extra_candidates: Vec<String>,
    ) -> Result<TaskRecord, TaskError> {
        self.lifecycle
            .append(task_id, caller_id, expected_version, extra_candidates)
            .await
    }

    /// See [`LifecycleManager::delete`].
    pub async fn delete(
        &self,
        task_id: &str,
        caller_id: &str,
        expected_version: u64,
    ) -> Result<(), TaskError> {
        self.lifecycle
            .delete(task_id, caller_id, expected_version)
            .await
    }

    /// See [`ExpirationScheduler::expire`].
    pub async fn expire(
        &self,
        task_id: &str,
        expected_version: u64,
    ) -> Result<TaskRecord, TaskError> {
        self.scheduler.expire(task_id, expected_version).await
    }

    /// See [`DefaultRoutingTrigger::pass_expired`].
    pub async fn pass_expired(&self, task_id: &str) -> Result<(), TaskError> {
        self.routing_trigger.pass_expired(task_id).await
    }

    /// See [`UrgeNotifier::urge`].
    pub async fn urge(&self, task_id: &str) -> Result<TaskRecord, TaskError> {
        self.urger.urge(task_id).await
    }

    /// The expiration scheduler, for lifecycle control
    /// ([`start`](ExpirationScheduler::start) /
    /// [`stop`](ExpirationScheduler::stop)) and manual sweeps.
    pub fn scheduler(&self) -> &ExpirationScheduler {
        &self.scheduler
    }

    /// The underlying store handle.
    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }
}
