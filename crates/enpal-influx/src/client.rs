// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Enpal Bridge.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use crate::query;
use crate::response::{FluxTable, parse_tables};
use async_trait::async_trait;
use enpal_core::{
    ConnectionParams, FetchError, FetchResult, INFLUX_BUCKET, INFLUX_ORG, MetricSource,
    MetricSourceFactory, Observation,
};
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Error body returned by the InfluxDB HTTP API
#[derive(Debug, Deserialize)]
struct InfluxErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<InfluxErrorBody>(body) {
        Ok(parsed) if !parsed.message.is_empty() => {
            if parsed.code.is_empty() {
                parsed.message
            } else {
                format!("{}: {}", parsed.code, parsed.message)
            }
        }
        _ => body.trim().to_owned(),
    }
}

/// Numeric reading of a `_value` cell; boolean series read as 1/0
fn parse_value(raw: &str) -> Option<f64> {
    match raw.trim() {
        "true" => Some(1.0),
        "false" => Some(0.0),
        other => other.parse::<f64>().ok(),
    }
}

fn transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(Box::new(e))
    }
}

/// InfluxDB v2 query client for the Enpal solar bucket
///
/// A fresh HTTP client is built for every query; nothing is pooled between
/// calls or shared between sensors.
#[derive(Debug, Clone)]
pub struct InfluxClient {
    params: ConnectionParams,
    org: String,
    bucket: String,
    timeout: Duration,
}

impl InfluxClient {
    pub fn new(params: ConnectionParams) -> Self {
        Self {
            params,
            org: INFLUX_ORG.to_owned(),
            bucket: INFLUX_BUCKET.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run a Flux query and return the result tables
    pub async fn query(&self, flux: &str) -> FetchResult<Vec<FluxTable>> {
        let url = format!("{}/api/v2/query", self.params.base_url());
        debug!("🔍 [INFLUX QUERY] {}", url);
        trace!("   Flux: {}", flux);

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(transport_error)?;

        let response = client
            .post(&url)
            .query(&[("org", self.org.as_str())])
            .header(header::AUTHORIZATION, format!("Token {}", self.params.token))
            .header(header::ACCEPT, "application/csv")
            .header(header::CONTENT_TYPE, "application/vnd.flux")
            .body(flux.to_owned())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        match status {
            StatusCode::OK => {
                let tables = parse_tables(&body)?;
                debug!("✅ [INFLUX RESULT] {} tables", tables.len());
                Ok(tables)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                error!("❌ [INFLUX ERROR] Authentication failed for {}", url);
                Err(FetchError::AuthenticationFailed(error_message(&body)))
            }
            status => {
                let message = error_message(&body);
                error!("❌ [INFLUX ERROR] Status {}: {}", status, message);
                Err(FetchError::Query {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl MetricSource for InfluxClient {
    async fn latest_observations(&self) -> FetchResult<Vec<Observation>> {
        let tables = self.query(&query::latest_samples(&self.bucket)).await?;

        let observations = tables
            .iter()
            .filter_map(|table| {
                let record = table.records.first()?;
                match (record.field(), record.measurement()) {
                    (Some(field), Some(measurement)) => Some(Observation::new(field, measurement)),
                    _ => {
                        warn!("⚠️ [INFLUX] Table without _field/_measurement skipped");
                        None
                    }
                }
            })
            .collect();
        Ok(observations)
    }

    async fn latest_value(&self, measurement: &str, field: &str) -> FetchResult<Option<f64>> {
        let tables = self
            .query(&query::latest_value(&self.bucket, measurement, field))
            .await?;

        let Some(record) = tables.first().and_then(|t| t.records.first()) else {
            return Ok(None);
        };
        let raw = record.value().ok_or_else(|| {
            FetchError::MalformedResponse("record has no _value column".to_owned())
        })?;

        parse_value(raw).map(Some).ok_or_else(|| FetchError::InvalidValue {
            field: field.to_owned(),
            value: raw.to_owned(),
        })
    }

    fn name(&self) -> &str {
        "InfluxDB"
    }
}

/// Creates one [`InfluxClient`] per sensor
#[derive(Debug, Clone)]
pub struct InfluxSourceFactory {
    timeout: Duration,
}

impl InfluxSourceFactory {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for InfluxSourceFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSourceFactory for InfluxSourceFactory {
    fn connect(&self, params: &ConnectionParams) -> Arc<dyn MetricSource> {
        Arc::new(InfluxClient::new(params.clone()).with_timeout(self.timeout))
    }
}
