//! OData job store client
//!
//! Speaks the job store's OData protocol: pending job orders are read from
//! the `v_JobOrders` view and completion is patched onto `JobOrder(<id>)`.
//! The store applies a stable order (`$orderby=ID`), which the dispatch
//! engine preserves.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use super::{Job, JobStatus, JobStore, StoreError};

/// Job store client for an OData service.
pub struct ODataJobStore {
    client: Client,
    base_url: String,
}

/// One row of the `v_JobOrders` view.
#[derive(Debug, Deserialize)]
struct JobOrderRow {
    #[serde(rename = "ID")]
    id: i64,
    #[serde(rename = "Command")]
    command: String,
    // The store may deliver the rule as any JSON scalar.
    #[serde(rename = "CommandRule", default)]
    command_rule: JsonValue,
}

#[derive(Debug, Deserialize)]
struct JobOrdersEnvelope {
    value: Vec<JobOrderRow>,
}

/// Normalize a `CommandRule` cell to the encoded-value string the codec
/// expects. Non-string scalars are rendered as their JSON text; `null`
/// becomes the empty string (which the codec classifies as not convertible).
fn rule_to_string(rule: &JsonValue) -> String {
    match rule {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

impl ODataJobStore {
    /// Create a client for the given service base URL, with every request
    /// bounded by `timeout`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl JobStore for ODataJobStore {
    async fn fetch_pending(
        &self,
        work_type: &str,
        status: JobStatus,
    ) -> Result<Vec<Job>, StoreError> {
        let url = format!("{}/v_JobOrders", self.base_url);
        let filter = format!("WorkType eq '{work_type}' and DispatchStatus eq '{status}'");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("$filter", filter.as_str()),
                ("$orderby", "ID"),
                ("$select", "ID,Command,CommandRule"),
            ])
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Unavailable(format!(
                "HTTP {} from {url}",
                response.status()
            )));
        }

        let envelope: JobOrdersEnvelope = response
            .json()
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))?;

        Ok(envelope
            .value
            .into_iter()
            .map(|row| Job {
                id: row.id,
                target_point: row.command,
                encoded_value: rule_to_string(&row.command_rule),
            })
            .collect())
    }

    async fn update_status(
        &self,
        job_id: i64,
        status: JobStatus,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let url = format!("{}/JobOrder({job_id})", self.base_url);
        let payload = json!({
            "DispatchStatus": status.to_string(),
            "EndTime": at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        });

        let response = self
            .client
            .patch(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Unavailable(format!(
                "HTTP {} from {url}",
                response.status()
            )));
        }

        Ok(())
    }
}
