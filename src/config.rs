//! Engine configuration.

use std::time::Duration;

use serde_json::Value;

/// Tunables for the task engine.
///
/// # Defaults
///
/// | Setting                 | Default      | Description                                 |
/// |-------------------------|--------------|---------------------------------------------|
/// | `sweep_interval`        | 30 seconds   | How often the expiration sweep runs         |
/// | `default_route_payload` | `null`       | Payload handed to the callback on `pass_expired` |
/// | `urge_retry_limit`      | 8            | CAS attempts for the urge counter update    |
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use flowdesk_tasks::EngineConfig;
///
/// let config = EngineConfig::default().with_sweep_interval(Duration::from_secs(5));
/// assert_eq!(config.sweep_interval, Duration::from_secs(5));
/// assert_eq!(config.urge_retry_limit, 8);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Interval between expiration sweeps. Worst-case detection latency
    /// for a missed deadline is one interval.
    pub sweep_interval: Duration,

    /// Payload handed to the routing callback when an expired task is
    /// default-routed. The engine never inspects it.
    pub default_route_payload: Value,

    /// How many times an urge retries its conditional write before
    /// reporting a conflict. Counter increments commute, so retrying on
    /// contention is safe.
    pub urge_retry_limit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(30),
            default_route_payload: Value::Null,
            urge_retry_limit: 8,
        }
    }
}

impl EngineConfig {
    /// Sets the expiration sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Sets the payload used when default-routing expired tasks.
    pub fn with_default_route_payload(mut self, payload: Value) -> Self {
        self.default_route_payload = payload;
        self
    }

    /// Sets the urge retry limit.
    pub fn with_urge_retry_limit(mut self, limit: u32) -> Self {
        self.urge_retry_limit = limit;
        self
    }
}
