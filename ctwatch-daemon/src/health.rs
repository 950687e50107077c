//! Health reporting for the running monitor.
//!
//! The orchestrator periodically builds a [`DaemonHealth`] snapshot from
//! the manager's `health_check()`, its source count and its counters,
//! and logs it. A status change is logged at `warn` so operators notice
//! a monitor that has gone degraded.

use serde::Serialize;

use ctwatch_core::pipeline::HealthStatus;
use ctwatch_monitor::StatsSnapshot;

/// Health report for the daemon.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonHealth {
    /// Monitor health status.
    pub status: HealthStatus,
    /// Daemon uptime in seconds since start.
    pub uptime_secs: u64,
    /// Number of CT logs being polled.
    pub sources: usize,
    /// Entries currently waiting in the output queue.
    pub queue_depth: usize,
    /// Cumulative monitor counters.
    pub stats: StatsSnapshot,
}

impl DaemonHealth {
    /// Short label for the status, used as a log field.
    pub fn status_label(&self) -> &'static str {
        match self.status {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded(_) => "degraded",
            HealthStatus::Unhealthy(_) => "unhealthy",
        }
    }

    /// Whether two reports differ in status kind (ignoring the reason text).
    pub fn status_changed(&self, previous: Option<&DaemonHealth>) -> bool {
        previous.is_none_or(|p| p.status_label() != self.status_label())
    }
}

/// Log a health report.
///
/// Routine reports go to `debug`; status changes go to `info` when healthy
/// and to `warn` otherwise.
pub fn log_health(health: &DaemonHealth, previous: Option<&DaemonHealth>) {
    let reason = match &health.status {
        HealthStatus::Healthy => "",
        HealthStatus::Degraded(r) | HealthStatus::Unhealthy(r) => r.as_str(),
    };

    if !health.status_changed(previous) {
        tracing::debug!(
            status = health.status_label(),
            uptime_secs = health.uptime_secs,
            sources = health.sources,
            queue_depth = health.queue_depth,
            matches = health.stats.matches,
            entries_dropped = health.stats.entries_dropped,
            "health check"
        );
    } else if health.status.is_healthy() {
        tracing::info!(
            status = health.status_label(),
            sources = health.sources,
            "monitor health changed"
        );
    } else {
        tracing::warn!(
            status = health.status_label(),
            reason = reason,
            sources = health.sources,
            "monitor health changed"
        );
    }
}
