//! Task lifecycle status and the transition rules between statuses.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a work item.
///
/// A task starts `Pending` and moves through the state machine below.
/// Terminal statuses (`Processed`, `DefaultRouted`, `Deleted`) accept no
/// further transitions; once reached, no field of the record changes again.
///
/// # State Machine
///
/// ```text
/// Pending -> Claimed, Processed, Expired, Deleted
/// Claimed -> Pending (reset), Processed, Expired, Deleted
/// Expired -> Pending (reset), Processed (late completion), DefaultRouted, Deleted
/// Processed / DefaultRouted / Deleted -> (terminal, no transitions)
/// ```
///
/// # Examples
///
/// ```
/// use flowdesk_tasks::TaskStatus;
///
/// assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Claimed));
/// assert!(TaskStatus::Expired.can_transition_to(TaskStatus::Processed));
/// assert!(!TaskStatus::Processed.can_transition_to(TaskStatus::Pending));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Awaiting action; any candidate may claim or complete it.
    Pending,
    /// Exclusively owned by the assignee.
    Claimed,
    /// Completed by a person and routed onward (terminal).
    Processed,
    /// Deadline passed without completion; awaiting default routing or a
    /// late human completion.
    Expired,
    /// Forwarded along the default path after expiring unhandled (terminal).
    DefaultRouted,
    /// Administratively withdrawn without advancing the process (terminal).
    Deleted,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Claimed => write!(f, "claimed"),
            Self::Processed => write!(f, "processed"),
            Self::Expired => write!(f, "expired"),
            Self::DefaultRouted => write!(f, "default_routed"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

impl TaskStatus {
    /// Returns `true` if this status accepts no further transitions.
    ///
    /// # Examples
    ///
    /// ```
    /// use flowdesk_tasks::TaskStatus;
    ///
    /// assert!(!TaskStatus::Pending.is_terminal());
    /// assert!(!TaskStatus::Expired.is_terminal());
    /// assert!(TaskStatus::Processed.is_terminal());
    /// assert!(TaskStatus::DefaultRouted.is_terminal());
    /// assert!(TaskStatus::Deleted.is_terminal());
    /// ```
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::DefaultRouted | Self::Deleted)
    }

    /// Returns `true` if a transition from this status to `next` is part of
    /// the state machine.
    ///
    /// This encodes status changes only; operations that mutate fields
    /// without changing status (candidate append, reassignment while
    /// `Pending`, urge bookkeeping) are guarded by the individual
    /// operations instead.
    pub fn can_transition_to(&self, next: Self) -> bool {
        match self {
            Self::Pending => matches!(
                next,
                Self::Claimed | Self::Processed | Self::Expired | Self::Deleted
            ),
            Self::Claimed => matches!(
                next,
                Self::Pending | Self::Processed | Self::Expired | Self::Deleted
            ),
            Self::Expired => matches!(
                next,
                Self::Pending | Self::Processed | Self::DefaultRouted | Self::Deleted
            ),
            Self::Processed | Self::DefaultRouted | Self::Deleted => false,
        }
    }
}
