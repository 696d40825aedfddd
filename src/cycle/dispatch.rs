//! Dispatch cycle
//!
//! One run of the fetch→write→report sequence. A cycle never fails as a
//! whole: a fetch or session-open error ends it early, and every per-job
//! error is classified, recorded, and absorbed so the scheduler can always
//! re-arm. Jobs are processed strictly in store order over a single
//! session owned by the running cycle.

use std::sync::Arc;

use chrono::Utc;

use crate::metrics::MetricsState;
use crate::session::{ControlSession, ControlSessionFactory, SessionError};
use crate::store::{Job, JobStatus, JobStore};
use crate::telemetry::{Severity, Telemetry};
use crate::value::TypedValue;

/// Outcome of a single job within a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The value was written and the store was told the job is done.
    Done,
    /// The job was not completed. The reason is observability-only: the
    /// job stays pending in the store and is retried next cycle.
    Failed(String),
}

/// Summary of one dispatch cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Jobs fetched from the store this cycle.
    pub fetched: usize,
    /// Jobs written and marked done.
    pub done: usize,
    /// Jobs that failed and remain pending.
    pub failed: usize,
    /// Set when the cycle ended before per-job processing.
    pub aborted: Option<String>,
}

/// Runs dispatch cycles against the configured collaborators.
///
/// The collaborators are owned dependencies passed in at construction;
/// there is no process-global session or lazily initialized shared state.
pub struct DispatchCycle {
    store: Arc<dyn JobStore>,
    sessions: Arc<dyn ControlSessionFactory>,
    telemetry: Arc<dyn Telemetry>,
    metrics: MetricsState,
    work_type: String,
}

impl DispatchCycle {
    /// Wire a cycle to its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn JobStore>,
        sessions: Arc<dyn ControlSessionFactory>,
        telemetry: Arc<dyn Telemetry>,
        metrics: MetricsState,
        work_type: impl Into<String>,
    ) -> Self {
        Self {
            store,
            sessions,
            telemetry,
            metrics,
            work_type: work_type.into(),
        }
    }

    /// The metrics handle this cycle writes to.
    #[must_use]
    pub fn metrics(&self) -> &MetricsState {
        &self.metrics
    }

    /// Run one full cycle to completion.
    ///
    /// Infallible by design: fetch and session-open failures abort the
    /// cycle early (the untouched jobs stay pending for the next tick),
    /// everything else is absorbed per job. The batch size is accumulated
    /// into the metrics and a snapshot is published on every exit path.
    pub async fn run_once(&self) -> CycleReport {
        let mut report = CycleReport::default();

        let jobs = match self
            .store
            .fetch_pending(&self.work_type, JobStatus::Pending)
            .await
        {
            Ok(jobs) => jobs,
            Err(err) => {
                self.abort_cycle(&mut report, &format!("fetch pending jobs: {err}"));
                self.finish(&report);
                return report;
            }
        };
        report.fetched = jobs.len();

        // No work: skip the session entirely to avoid connection churn.
        if jobs.is_empty() {
            self.finish(&report);
            return report;
        }

        // One session serves the whole batch.
        let mut session = match self.sessions.open().await {
            Ok(session) => session,
            Err(err) => {
                self.abort_cycle(&mut report, &format!("open control session: {err}"));
                self.finish(&report);
                return report;
            }
        };

        for job in &jobs {
            match self.process_job(session.as_mut(), job).await {
                Ok(JobOutcome::Done) => report.done += 1,
                Ok(JobOutcome::Failed(reason)) => {
                    report.failed += 1;
                    self.record_job_failure(job, &reason);
                }
                Err(fault) => {
                    // The shared transport may be broken; reconnect once
                    // and carry on with the next job.
                    report.failed += 1;
                    self.record_job_failure(job, &fault.to_string());
                    if let Err(err) = session.reconnect().await {
                        self.telemetry.emit(
                            Severity::Warning,
                            &format!("session reconnect failed: {err}"),
                        );
                    }
                }
            }
        }

        session.close().await;
        self.finish(&report);
        report
    }

    /// Decode, resolve, and write one job.
    ///
    /// `Ok(JobOutcome)` is a classified result; `Err` is a transport fault
    /// that the batch loop answers with a reconnect.
    async fn process_job(
        &self,
        session: &mut dyn ControlSession,
        job: &Job,
    ) -> Result<JobOutcome, SessionError> {
        let Some(value) = TypedValue::decode(&job.encoded_value) else {
            return Ok(JobOutcome::Failed("value not convertible".to_string()));
        };

        let Some(point) = session.find_point(&job.target_point).await? else {
            return Ok(JobOutcome::Failed("point not found".to_string()));
        };

        // Read before writing so attribute metadata survives the update.
        let _descriptor = session.read_current(&point).await?;

        let status = session.write(&point, value.clone()).await?;
        if !status.is_good() {
            return Ok(JobOutcome::Failed(format!("write rejected: {status}")));
        }

        self.metrics.record_activity(Utc::now());
        self.telemetry.emit(
            Severity::Info,
            &format!(
                "job {}: wrote ({}) {value} to '{}'",
                job.id,
                value.type_name(),
                job.target_point
            ),
        );

        // Only confirmed writes are persisted; an update failure is logged
        // and the job will be re-dispatched next cycle.
        if let Err(err) = self
            .store
            .update_status(job.id, JobStatus::Done, Utc::now())
            .await
        {
            self.telemetry.emit(
                Severity::Warning,
                &format!("job {}: status update failed: {err}", job.id),
            );
        }

        Ok(JobOutcome::Done)
    }

    /// Record a cycle-level failure that prevented per-job processing.
    fn abort_cycle(&self, report: &mut CycleReport, message: &str) {
        report.aborted = Some(message.to_string());
        self.metrics.record_error(message);
        self.telemetry.emit(Severity::Error, message);
    }

    /// Record a per-job failure. The job is not marked in the store.
    fn record_job_failure(&self, job: &Job, reason: &str) {
        let message = format!("job {}: {reason}", job.id);
        self.metrics.record_error(&message);
        self.telemetry.emit(Severity::Error, &message);
    }

    /// Aggregate counters and publish the snapshot. Runs on every exit path.
    fn finish(&self, report: &CycleReport) {
        self.metrics.add_jobs_processed(report.fetched as u64);
        self.telemetry.publish(&self.metrics.snapshot());
        self.telemetry.emit(
            Severity::Info,
            &format!(
                "dispatch cycle done: {} fetched, {} done, {} failed",
                report.fetched, report.done, report.failed
            ),
        );
    }
}
