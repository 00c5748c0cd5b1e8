//! Concurrency properties: exactly-one-winner claims and the races
//! between completion, expiration, and default routing.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;

use flowdesk_tasks::store::InMemoryTaskStore;
use flowdesk_tasks::{
    NotificationDispatcher, RoutingCallback, RoutingError, RoutingOutcome, TaskEngine, TaskError,
    TaskRecord, TaskStatus,
};

/// Routing callback that only counts successful invocations.
#[derive(Default)]
struct CountingRouter {
    calls: AtomicUsize,
}

#[async_trait]
impl RoutingCallback for CountingRouter {
    async fn route(
        &self,
        _job_id: &str,
        _activity_ref: &str,
        _payload: &Value,
    ) -> Result<RoutingOutcome, RoutingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RoutingOutcome::Completed)
    }
}

struct NullDispatcher;

#[async_trait]
impl NotificationDispatcher for NullDispatcher {
    async fn notify(&self, _person_ids: &[String], _task_id: &str) {}
}

fn people(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| (*n).to_string()).collect()
}

fn engine() -> (Arc<TaskEngine>, Arc<CountingRouter>) {
    let router = Arc::new(CountingRouter::default());
    let engine = Arc::new(TaskEngine::new(
        Arc::new(InMemoryTaskStore::new()),
        Arc::clone(&router) as Arc<dyn RoutingCallback>,
        Arc::new(NullDispatcher) as Arc<dyn NotificationDispatcher>,
    ));
    (engine, router)
}

/// Builds a task whose deadline already passed, bypassing the creation
/// validation by rewriting the deadline before insert.
async fn insert_overdue(engine: &TaskEngine, names: &[&str]) -> TaskRecord {
    let mut record = TaskRecord::new(
        "job-race",
        "act-race",
        people(names),
        Some(Utc::now() + Duration::minutes(5)),
    )
    .unwrap();
    record.deadline = Some(Utc::now() - Duration::seconds(5));
    engine.store().insert(record).await.unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_have_exactly_one_winner() {
    let (engine, _) = engine();
    let names: Vec<String> = (0..8).map(|i| format!("person-{i}")).collect();
    let candidates: BTreeSet<String> = names.iter().cloned().collect();
    let task = engine
        .create("job-1", "act-1", candidates, None)
        .await
        .unwrap();

    let handles: Vec<_> = names
        .iter()
        .map(|name| {
            let engine = Arc::clone(&engine);
            let task_id = task.task_id.clone();
            let name = name.clone();
            let version = task.version;
            tokio::spawn(async move { engine.claim(&task_id, &name, version).await })
        })
        .collect();

    let mut winners = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(claimed) => {
                winners += 1;
                assert_eq!(claimed.status, TaskStatus::Claimed);
            }
            Err(TaskError::Conflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(conflicts, names.len() - 1);

    // The winner really is the recorded assignee.
    let current = engine.get(&task.task_id).await.unwrap();
    assert_eq!(current.status, TaskStatus::Claimed);
    assert!(current
        .assignee
        .as_deref()
        .is_some_and(|a| names.iter().any(|n| n == a)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn processing_and_sweep_race_yields_one_outcome() {
    let (engine, router) = engine();
    let task = insert_overdue(&engine, &["alice"]).await;

    let processing = {
        let engine = Arc::clone(&engine);
        let task_id = task.task_id.clone();
        let version = task.version;
        tokio::spawn(async move {
            engine
                .processing(&task_id, "alice", version, &Value::Null)
                .await
        })
    };
    let sweep = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.scheduler().sweep_once().await })
    };

    let processing_result = processing.await.unwrap();
    sweep.await.unwrap().unwrap();

    let current = engine.get(&task.task_id).await.unwrap();
    match processing_result {
        Ok(_) => {
            // The completion landed first; the sweep skipped its conflict.
            assert_eq!(current.status, TaskStatus::Processed);
            assert_eq!(router.calls.load(Ordering::SeqCst), 1);
        }
        Err(TaskError::Conflict { .. }) => {
            // The sweep won; the completion never routed.
            assert_eq!(current.status, TaskStatus::Expired);
            assert_eq!(router.calls.load(Ordering::SeqCst), 0);
        }
        Err(other) => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_pass_expired_routes_exactly_once() {
    let (engine, router) = engine();
    let task = insert_overdue(&engine, &["alice"]).await;
    engine.expire(&task.task_id, task.version).await.unwrap();

    let first = {
        let engine = Arc::clone(&engine);
        let task_id = task.task_id.clone();
        tokio::spawn(async move { engine.pass_expired(&task_id).await })
    };
    let second = {
        let engine = Arc::clone(&engine);
        let task_id = task.task_id.clone();
        tokio::spawn(async move { engine.pass_expired(&task_id).await })
    };

    // Both invocations report success; the loser of the write race treats
    // "already default-routed" as done.
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    assert_eq!(router.calls.load(Ordering::SeqCst), 1);
    let current = engine.get(&task.task_id).await.unwrap();
    assert_eq!(current.status, TaskStatus::DefaultRouted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_urges_all_land() {
    let (engine, _) = engine();
    let task = engine
        .create("job-1", "act-1", people(&["alice"]), None)
        .await
        .unwrap();

    let results =
        futures::future::join_all((0..4).map(|_| engine.urge(&task.task_id))).await;
    for result in results {
        result.unwrap();
    }

    let current = engine.get(&task.task_id).await.unwrap();
    assert_eq!(current.urge_count, 4);
}
