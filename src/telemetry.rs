//! Observability sink contracts
//!
//! Telemetry is strictly fire-and-forget: events and snapshots flow out of
//! the dispatch cycle, and nothing here may fail back into it. Operators
//! observe failures exclusively through these emissions and the metrics
//! snapshot; no synchronous caller awaits per-job results.

use crate::metrics::StatsSnapshot;

/// Severity of an emitted telemetry event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Routine progress.
    Info,
    /// Degraded but continuing.
    Warning,
    /// A recorded failure.
    Error,
}

/// Observability sink for dispatch events and metrics snapshots.
pub trait Telemetry: Send + Sync {
    /// Emit a one-off event.
    fn emit(&self, severity: Severity, message: &str);

    /// Publish the current metrics snapshot.
    fn publish(&self, snapshot: &StatsSnapshot);
}

/// Telemetry sink that forwards to `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn emit(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => tracing::info!("{message}"),
            Severity::Warning => tracing::warn!("{message}"),
            Severity::Error => tracing::error!("{message}"),
        }
    }

    fn publish(&self, snapshot: &StatsSnapshot) {
        tracing::info!(
            jobs_processed = snapshot.stats.jobs_processed,
            last_activity_time = ?snapshot.stats.last_activity_time,
            last_error = %snapshot.stats.last_error,
            uptime_secs = snapshot.uptime_secs,
            "metrics snapshot"
        );
    }
}
