//! Job store contracts
//!
//! The job store is the remote system of record for job orders. The
//! dispatch engine fetches pending jobs from it and patches a job's status
//! back once — and only once — a write has been confirmed successful.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod odata;

pub use odata::ODataJobStore;

/// A unit of work: one value to write to one control point.
///
/// Immutable once fetched; consumed exactly once per cycle attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Job order identifier in the store.
    pub id: i64,
    /// Name of the control point this job targets.
    pub target_point: String,
    /// Encoded command value, e.g. `(DOUBLE)12.5`.
    pub encoded_value: String,
}

/// Lifecycle status of a job order in the store.
///
/// The engine only ever persists `Done`; failed jobs stay `Pending` so the
/// next cycle retries them (at-least-once delivery).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Waiting to be dispatched.
    Pending,
    /// Written and confirmed by the endpoint.
    Done,
    /// Never persisted by this agent; defined for completeness of the
    /// store's vocabulary.
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Done => write!(f, "Done"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Errors surfaced by the job store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport or authentication failure reaching the store.
    #[error("job store unavailable: {0}")]
    Unavailable(String),
    /// The store answered with a malformed response.
    #[error("job store protocol error: {0}")]
    Protocol(String),
}

/// Remote store of job orders.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Fetch all jobs of the given work type in the given status, in the
    /// store's stable order.
    async fn fetch_pending(
        &self,
        work_type: &str,
        status: JobStatus,
    ) -> Result<Vec<Job>, StoreError>;

    /// Patch a job's status. Failures are logged by the caller but not
    /// retried within the same cycle.
    async fn update_status(
        &self,
        job_id: i64,
        status: JobStatus,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}
