//! Routing callback contract.
//!
//! When a task is completed (or default-routed after expiring), the process
//! interpreter decides what happens next in the owning process instance.
//! That decision is opaque to this engine: it is consumed as the
//! [`RoutingCallback`] trait, and its answer is a [`RoutingOutcome`]. The
//! engine guarantees the callback fires at most once per committed
//! transition; see `engine` for the commit ordering.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The process interpreter's decision after a task is routed.
///
/// One variant per next-step style: a single successor activity, a fan-out
/// into several parallel activities, or completion of the whole process
/// instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoutingOutcome {
    /// The process continues at one successor activity.
    Successor {
        /// The activity the process moved to.
        activity_ref: String,
    },
    /// The process fans out into several parallel activities.
    FanOut {
        /// The activities the process moved to.
        activity_refs: Vec<String>,
    },
    /// The process instance finished.
    Completed,
}

/// Failure reported by the routing callback.
///
/// The engine surfaces this as
/// [`TaskError::RoutingFailed`](crate::error::TaskError::RoutingFailed)
/// after restoring the task's pre-operation state.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RoutingError {
    /// Human-readable description of the failure.
    pub message: String,
}

impl RoutingError {
    /// Creates a routing error from any displayable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// External hook that advances the owning process instance.
///
/// Implementations decide the successor activity (or process completion)
/// for the given job and activity, optionally consuming the completion
/// payload submitted by the person who handled the task.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; completions and the default
/// routing of expired tasks invoke the callback concurrently.
#[async_trait]
pub trait RoutingCallback: Send + Sync {
    /// Routes the process forward after a task transition commits.
    ///
    /// # Errors
    ///
    /// Any error aborts the enclosing transition: the engine restores the
    /// task's previous state and reports the failure to the caller, who
    /// may retry.
    async fn route(
        &self,
        job_id: &str,
        activity_ref: &str,
        payload: &Value,
    ) -> Result<RoutingOutcome, RoutingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_serde_round_trip() {
        for outcome in [
            RoutingOutcome::Successor {
                activity_ref: "act-next".to_string(),
            },
            RoutingOutcome::FanOut {
                activity_refs: vec!["act-a".to_string(), "act-b".to_string()],
            },
            RoutingOutcome::Completed,
        ] {
            let json = serde_json::to_value(&outcome).unwrap();
            let back: RoutingOutcome = serde_json::from_value(json).unwrap();
            assert_eq!(back, outcome);
        }
    }

    #[test]
    fn routing_error_display() {
        let err = RoutingError::new("interpreter unavailable");
        assert_eq!(err.to_string(), "interpreter unavailable");
    }
}
