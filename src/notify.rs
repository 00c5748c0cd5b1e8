//! Notification dispatch contract.
//!
//! Reminder delivery (mail, IM, whatever the platform wires up) is an
//! external concern. The engine only triggers it: the urge operation
//! updates the task's reminder bookkeeping and then hands the recipient
//! list to this trait. Delivery is fire-and-forget; a dispatcher that
//! drops a reminder loses nothing but the reminder.

use async_trait::async_trait;

/// External reminder delivery hook.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; urges for different tasks may
/// dispatch concurrently.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Delivers a reminder about `task_id` to `person_ids`. Best effort;
    /// there is no failure channel back into the engine.
    async fn notify(&self, person_ids: &[String], task_id: &str);
}
