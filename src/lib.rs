//! Dispatchd - Scheduled command-dispatch agent
//!
//! Dispatchd relays pending job orders from a remote job store to an
//! industrial control endpoint: on a fixed interval it fetches the pending
//! batch, decodes each job's encoded command value into a typed scalar,
//! writes it to the named point over a single session, and reports per-job
//! outcomes to the store and to telemetry. One failed job never aborts the
//! batch, and cycles never overlap.
//!
//! The job store and the control endpoint are collaborators behind the
//! [`store::JobStore`] and [`session::ControlSession`] traits; an OData
//! job store client is provided, the control protocol is supplied by the
//! host.

// Allow multiple crate versions from dependencies (can't easily control)
#![allow(clippy::multiple_crate_versions)]

pub mod config;
pub mod cycle;
pub mod metrics;
pub mod session;
pub mod store;
pub mod telemetry;
pub mod value;

#[cfg(test)]
pub mod testutil;

// Re-export commonly used types
pub use config::AgentConfig;
pub use cycle::dispatch::{CycleReport, DispatchCycle, JobOutcome};
pub use cycle::scheduler::CycleScheduler;
pub use metrics::{AgentInfo, CycleStats, MetricsState, StatsSnapshot};
pub use session::{
    ControlSession, ControlSessionFactory, PointClass, PointHandle, SessionError,
    ValueDescriptor, WriteStatus,
};
pub use store::{Job, JobStatus, JobStore, ODataJobStore, StoreError};
pub use telemetry::{Severity, Telemetry, TracingTelemetry};
pub use value::TypedValue;
