//! Work-item lifecycle engine for the Flowdesk process platform.
//!
//! As a process instance executes, it hands pending-action records
//! ("tasks") to human participants. This crate manages those records:
//! who may claim and complete a task, how administrative corrections
//! (reset, append, delete) interleave with live user action, and how
//! tasks escalate automatically when their deadline passes.
//!
//! # Concurrency Model
//!
//! Every mutation funnels through one primitive: the store's conditional
//! write, keyed on a per-record monotonic version. There is no other
//! shared mutable state and no client-side locking, which makes every
//! transition linearizable per task -- of any set of concurrent writers,
//! exactly one commits and the rest observe a typed
//! [`Conflict`](TaskError::Conflict) telling them to re-read. The same
//! discipline lets the time-driven expiration sweep race safely against
//! user completions: whichever write lands first wins, and the loser's
//! side effects never happened.
//!
//! # Module Organization
//!
//! - [`domain`] -- the task record and its status state machine
//! - [`store`] -- the storage contract and the in-memory implementation
//! - [`engine`] -- claim coordination, lifecycle transitions, expiration,
//!   default routing, reminders, and the [`TaskEngine`] facade
//! - [`routing`] / [`notify`] -- contracts consumed from the surrounding
//!   platform (process interpreter, notification delivery)
//! - [`error`] -- the typed error surface
//! - [`config`] -- engine tunables

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod notify;
pub mod routing;
pub mod store;

// Re-exports for ergonomic access
pub use config::EngineConfig;
pub use domain::{TaskRecord, TaskStatus};
pub use engine::{
    ClaimCoordinator, DefaultRoutingTrigger, ExpirationScheduler, LifecycleManager, TaskEngine,
    UrgeNotifier,
};
pub use error::TaskError;
pub use notify::NotificationDispatcher;
pub use routing::{RoutingCallback, RoutingError, RoutingOutcome};
pub use store::{InMemoryTaskStore, StoreError, TaskStore};
