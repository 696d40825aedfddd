//! Dispatchd - Scheduled command-dispatch agent
//!
//! CLI entry point: loads configuration, wires the job store and the
//! control endpoint into a dispatch cycle, and drives the scheduler until
//! interrupted.

// Allow multiple crate versions from dependencies (can't easily control)
#![allow(clippy::multiple_crate_versions)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use dispatchd::{
    AgentConfig, AgentInfo, ControlSession, ControlSessionFactory, CycleScheduler, DispatchCycle,
    MetricsState, ODataJobStore, PointClass, PointHandle, SessionError, TracingTelemetry,
    TypedValue, ValueDescriptor, WriteStatus,
};

/// Scheduled command-dispatch agent
///
/// Relays pending job orders from an OData job store to an industrial
/// control endpoint on a fixed interval.
#[derive(Parser, Debug)]
#[command(name = "dispatchd", version, about)]
struct Cli {
    /// Path to the dispatchd.toml configuration file
    #[arg(long, default_value = "dispatchd.toml")]
    config: PathBuf,

    /// Run a single dispatch cycle and exit
    #[arg(long)]
    once: bool,
}

/// Resolve the control endpoint backend from the configured URL scheme.
///
/// The real control protocol is supplied by the host embedding this crate
/// as a library; the binary ships only the in-memory `sim://` backend for
/// local development against a live job store.
fn control_endpoint(config: &AgentConfig) -> Result<Arc<dyn ControlSessionFactory>> {
    match config.endpoint_url.split_once("://") {
        Some(("sim", _)) => Ok(Arc::new(SimEndpoint::new(&config.identity_label))),
        Some((scheme, _)) => bail!(
            "no control backend for '{scheme}://' endpoints; embed dispatchd as a \
             library and supply a ControlSessionFactory for this protocol"
        ),
        None => bail!("endpoint_url '{}' has no scheme", config.endpoint_url),
    }
}

/// In-memory control endpoint. Every point resolves, every write is
/// accepted with a good status, and written values stay readable for the
/// lifetime of the process.
struct SimEndpoint {
    identity_label: String,
    points: Arc<Mutex<HashMap<String, TypedValue>>>,
}

impl SimEndpoint {
    fn new(identity_label: &str) -> Self {
        Self {
            identity_label: identity_label.to_string(),
            points: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

struct SimSession {
    points: Arc<Mutex<HashMap<String, TypedValue>>>,
}

#[async_trait]
impl ControlSessionFactory for SimEndpoint {
    async fn open(&self) -> Result<Box<dyn ControlSession>, SessionError> {
        tracing::info!(session = %self.identity_label, "opened simulated control session");
        Ok(Box::new(SimSession {
            points: Arc::clone(&self.points),
        }))
    }
}

#[async_trait]
impl ControlSession for SimSession {
    async fn find_point(&mut self, name: &str) -> Result<Option<PointHandle>, SessionError> {
        Ok(Some(PointHandle {
            name: name.to_string(),
            node_id: format!("sim:{name}"),
        }))
    }

    async fn read_current(&mut self, point: &PointHandle) -> Result<ValueDescriptor, SessionError> {
        let points = self.points.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(ValueDescriptor {
            class: PointClass::Variable,
            current: points.get(&point.name).cloned(),
        })
    }

    async fn write(
        &mut self,
        point: &PointHandle,
        value: TypedValue,
    ) -> Result<WriteStatus, SessionError> {
        tracing::info!(point = %point.name, value = %value, "simulated write");
        self.points
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(point.name.clone(), value);
        Ok(WriteStatus::good())
    }

    async fn reconnect(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn close(&mut self) {}
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = AgentConfig::from_path(&cli.config)
        .with_context(|| format!("Failed to load config from '{}'", cli.config.display()))?;

    // Wire the collaborators
    let store = Arc::new(
        ODataJobStore::new(&config.store_url, config.call_timeout())
            .context("Failed to build the job store client")?,
    );
    let sessions = control_endpoint(&config)?;
    let metrics = MetricsState::new(AgentInfo::from_config(&config));

    let cycle = DispatchCycle::new(
        store,
        sessions,
        Arc::new(TracingTelemetry),
        metrics,
        config.work_type.clone(),
    );

    if cli.once {
        let report = cycle.run_once().await;
        tracing::info!(
            fetched = report.fetched,
            done = report.done,
            failed = report.failed,
            "dispatch cycle finished"
        );
        if let Some(reason) = report.aborted {
            bail!("dispatch cycle aborted: {reason}");
        }
        return Ok(());
    }

    let scheduler = CycleScheduler::new(cycle, config.poll_interval());
    scheduler.start();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    scheduler.stop();

    Ok(())
}
