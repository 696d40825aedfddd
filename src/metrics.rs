//! Process-wide dispatch metrics
//!
//! `MetricsState` is the only state that outlives a cycle. It is mutated
//! exclusively by the dispatch cycle (which the scheduler serializes) and
//! read concurrently by telemetry consumers through consistent snapshots.
//! It is initialized once at construction and never reset for the lifetime
//! of the process.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::AgentConfig;

/// Static facts about the running agent, fixed at startup.
#[derive(Debug, Clone, Serialize)]
pub struct AgentInfo {
    /// Application name.
    pub app_name: String,
    /// Host the agent runs on.
    pub host_name: String,
    /// Crate version.
    pub version: String,
    /// When the agent started.
    pub start_time: DateTime<Utc>,
    /// Seconds between dispatch cycles.
    pub poll_interval_secs: u64,
    /// Base URL of the job store.
    pub store_url: String,
}

impl AgentInfo {
    /// Build the agent's identity from its configuration.
    ///
    /// The host name is resolved from the OS, not the environment; service
    /// managers often run without `HOSTNAME` set.
    #[must_use]
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            app_name: env!("CARGO_PKG_NAME").to_string(),
            host_name: whoami::fallible::hostname().unwrap_or_else(|_| "unknown".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Utc::now(),
            poll_interval_secs: config.poll_interval_secs,
            store_url: config.store_url.clone(),
        }
    }
}

/// Counters mutated by the dispatch cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleStats {
    /// Total jobs fetched across all cycles (batch sizes, not successes).
    pub jobs_processed: u64,
    /// Time of the last confirmed point write.
    pub last_activity_time: Option<DateTime<Utc>>,
    /// Most recent failure; empty until one occurs.
    pub last_error: String,
}

/// A consistent read of the agent's metrics.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    /// Static agent identity.
    pub info: AgentInfo,
    /// Current counters.
    pub stats: CycleStats,
    /// Seconds since the agent started.
    pub uptime_secs: i64,
}

/// Cheap-to-clone handle over the process-wide metrics.
///
/// Writers only exist inside the dispatch cycle; the lock serves the
/// concurrent read path. Lock poisoning is ignored: the stats are plain
/// data and remain usable after a panicked writer.
#[derive(Clone)]
pub struct MetricsState {
    info: Arc<AgentInfo>,
    stats: Arc<RwLock<CycleStats>>,
}

impl MetricsState {
    /// Create fresh metrics for the given agent identity.
    #[must_use]
    pub fn new(info: AgentInfo) -> Self {
        Self {
            info: Arc::new(info),
            stats: Arc::new(RwLock::new(CycleStats::default())),
        }
    }

    /// Accumulate the size of a fetched batch.
    pub fn add_jobs_processed(&self, count: u64) {
        let mut stats = self
            .stats
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        stats.jobs_processed += count;
    }

    /// Record the time of a confirmed point write.
    pub fn record_activity(&self, at: DateTime<Utc>) {
        let mut stats = self
            .stats
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        stats.last_activity_time = Some(at);
    }

    /// Record the most recent failure, stamped with the current time.
    pub fn record_error(&self, message: &str) {
        let mut stats = self
            .stats
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        stats.last_error = format!("{message}. On {}", Utc::now().format("%Y-%m-%d %H:%M:%S"));
    }

    /// Take a consistent snapshot for publishing.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let stats = self
            .stats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        StatsSnapshot {
            info: (*self.info).clone(),
            uptime_secs: (Utc::now() - self.info.start_time).num_seconds(),
            stats,
        }
    }
}
