//! Shared test utilities
//!
//! In-memory collaborator fakes used across test modules. Only compiled in
//! test builds.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::metrics::{AgentInfo, MetricsState, StatsSnapshot};
use crate::session::{
    ControlSession, ControlSessionFactory, PointClass, PointHandle, SessionError,
    ValueDescriptor, WriteStatus,
};
use crate::store::{Job, JobStatus, JobStore, StoreError};
use crate::telemetry::{Severity, Telemetry};
use crate::value::TypedValue;

/// Build a job targeting `point` with the given encoded value.
#[must_use]
pub fn make_job(id: i64, point: &str, encoded_value: &str) -> Job {
    Job {
        id,
        target_point: point.to_string(),
        encoded_value: encoded_value.to_string(),
    }
}

/// Fresh metrics with a fixed test identity.
#[must_use]
pub fn make_metrics() -> MetricsState {
    MetricsState::new(AgentInfo {
        app_name: "dispatchd".to_string(),
        host_name: "testhost".to_string(),
        version: "0.0.0-test".to_string(),
        start_time: Utc::now(),
        poll_interval_secs: 1,
        store_url: "http://store/odata".to_string(),
    })
}

/// In-memory job store fake.
///
/// Returns a fixed batch on every fetch and records status updates. The
/// in-flight gauge lets scheduler tests prove cycles never overlap.
#[derive(Default)]
pub struct MockStore {
    jobs: Vec<Job>,
    fail_fetch: bool,
    fail_update: bool,
    fetch_delay: Duration,
    /// Status updates received, in order.
    pub updates: Mutex<Vec<(i64, JobStatus, DateTime<Utc>)>>,
    /// Total fetch calls observed.
    pub fetch_count: AtomicUsize,
    in_flight: AtomicUsize,
    /// Highest number of concurrent fetches observed.
    pub max_in_flight: AtomicUsize,
}

impl MockStore {
    /// Store that returns the given batch on every fetch.
    #[must_use]
    pub fn with_jobs(jobs: Vec<Job>) -> Self {
        Self {
            jobs,
            ..Self::default()
        }
    }

    /// Store with no pending jobs.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Store whose fetch always fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_fetch: true,
            ..Self::default()
        }
    }

    /// Make every fetch take at least `delay` before answering.
    #[must_use]
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Make every status update fail.
    #[must_use]
    pub fn failing_updates(mut self) -> Self {
        self.fail_update = true;
        self
    }

    /// Status updates received so far.
    #[must_use]
    pub fn recorded_updates(&self) -> Vec<(i64, JobStatus)> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .map(|(id, status, _)| (*id, *status))
            .collect()
    }
}

#[async_trait]
impl JobStore for MockStore {
    async fn fetch_pending(
        &self,
        _work_type: &str,
        _status: JobStatus,
    ) -> Result<Vec<Job>, StoreError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_fetch {
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        Ok(self.jobs.clone())
    }

    async fn update_status(
        &self,
        job_id: i64,
        status: JobStatus,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if self.fail_update {
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        self.updates.lock().unwrap().push((job_id, status, at));
        Ok(())
    }
}

/// Everything the mock sessions record, shared with the factory so tests
/// can assert after the cycle has dropped its session.
#[derive(Default)]
pub struct SessionLog {
    /// Sessions opened.
    pub opens: AtomicUsize,
    /// Reconnect calls.
    pub reconnects: AtomicUsize,
    /// Close calls.
    pub closes: AtomicUsize,
    /// Writes performed, as (point name, value).
    pub writes: Mutex<Vec<(String, TypedValue)>>,
}

/// Scripted control-session factory.
pub struct MockFactory {
    /// Shared record of session activity.
    pub log: Arc<SessionLog>,
    known_points: Vec<String>,
    write_statuses: HashMap<String, WriteStatus>,
    fault_points: Vec<String>,
    fail_open: bool,
}

impl MockFactory {
    /// Factory whose sessions know the given points; every write succeeds.
    #[must_use]
    pub fn new(known_points: &[&str]) -> Self {
        Self {
            log: Arc::new(SessionLog::default()),
            known_points: known_points.iter().map(ToString::to_string).collect(),
            write_statuses: HashMap::new(),
            fault_points: Vec::new(),
            fail_open: false,
        }
    }

    /// Factory whose `open` always fails.
    #[must_use]
    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::new(&[])
        }
    }

    /// Make writes to `point` return the given status.
    #[must_use]
    pub fn with_write_status(mut self, point: &str, status: WriteStatus) -> Self {
        self.write_statuses.insert(point.to_string(), status);
        self
    }

    /// Make the first lookup of `point` fail with a transport fault.
    #[must_use]
    pub fn with_fault_on(mut self, point: &str) -> Self {
        self.fault_points.push(point.to_string());
        self
    }
}

#[async_trait]
impl ControlSessionFactory for MockFactory {
    async fn open(&self) -> Result<Box<dyn ControlSession>, SessionError> {
        if self.fail_open {
            return Err(SessionError::Open("endpoint unreachable".to_string()));
        }
        self.log.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            log: Arc::clone(&self.log),
            known_points: self.known_points.clone(),
            write_statuses: self.write_statuses.clone(),
            fault_points: self.fault_points.clone(),
            faulted: AtomicBool::new(false),
        }))
    }
}

struct MockSession {
    log: Arc<SessionLog>,
    known_points: Vec<String>,
    write_statuses: HashMap<String, WriteStatus>,
    fault_points: Vec<String>,
    faulted: AtomicBool,
}

#[async_trait]
impl ControlSession for MockSession {
    async fn find_point(&mut self, name: &str) -> Result<Option<PointHandle>, SessionError> {
        // A scripted fault fires once; after a reconnect the link is healthy.
        if self.fault_points.iter().any(|p| p == name)
            && !self.faulted.swap(true, Ordering::SeqCst)
        {
            return Err(SessionError::Transport("link down".to_string()));
        }
        if self.known_points.iter().any(|p| p == name) {
            Ok(Some(PointHandle {
                name: name.to_string(),
                node_id: format!("ns=2;s={name}"),
            }))
        } else {
            Ok(None)
        }
    }

    async fn read_current(
        &mut self,
        _point: &PointHandle,
    ) -> Result<ValueDescriptor, SessionError> {
        Ok(ValueDescriptor {
            class: PointClass::Variable,
            current: None,
        })
    }

    async fn write(
        &mut self,
        point: &PointHandle,
        value: TypedValue,
    ) -> Result<WriteStatus, SessionError> {
        self.log
            .writes
            .lock()
            .unwrap()
            .push((point.name.clone(), value));
        Ok(self
            .write_statuses
            .get(&point.name)
            .cloned()
            .unwrap_or_else(WriteStatus::good))
    }

    async fn reconnect(&mut self) -> Result<(), SessionError> {
        self.log.reconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Telemetry sink that records emissions for assertions.
#[derive(Default)]
pub struct RecordingTelemetry {
    /// Events emitted, in order.
    pub events: Mutex<Vec<(Severity, String)>>,
    /// Snapshots published.
    pub snapshots: Mutex<Vec<StatsSnapshot>>,
}

impl RecordingTelemetry {
    /// Messages emitted at the given severity.
    #[must_use]
    pub fn messages_at(&self, severity: Severity) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Number of snapshots published.
    #[must_use]
    pub fn publish_count(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }
}

impl Telemetry for RecordingTelemetry {
    fn emit(&self, severity: Severity, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push((severity, message.to_string()));
    }

    fn publish(&self, snapshot: &StatsSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot.clone());
    }
}
