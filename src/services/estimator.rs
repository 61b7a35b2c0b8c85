// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client for the external emission estimator.
//!
//! The estimator turns a free-text activity description into an estimated
//! kg CO₂e figure. It is advisory only: nothing here writes to the store,
//! so a failed call never affects anyone's totals.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Longest description forwarded to the estimator.
pub const MAX_ESTIMATE_DESCRIPTION_LEN: usize = 500;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Estimator failures. Callers fall back to manual category selection.
#[derive(Debug, thiserror::Error)]
pub enum EstimatorError {
    #[error("rate limit exceeded, try again later")]
    RateLimited,

    #[error("estimator credits exhausted")]
    PaymentRequired,

    #[error("malformed estimator response: {0}")]
    Malformed(String),

    #[error("estimator request failed: {0}")]
    Http(String),

    #[error("emission estimation is not configured")]
    NotConfigured,
}

/// Estimate returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EmissionEstimate {
    /// kg CO₂e
    pub carbon_amount: f64,
    #[serde(default)]
    pub suggested_category: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Serialize)]
struct EstimateRequest<'a> {
    description: &'a str,
}

/// HTTP client for the estimator endpoint.
#[derive(Clone)]
pub struct EstimatorClient {
    http: reqwest::Client,
    endpoint: Option<String>,
    api_key: Option<String>,
}

impl EstimatorClient {
    pub fn new(endpoint: Option<String>, api_key: Option<String>) -> anyhow::Result<Self> {
        Self::with_timeout(endpoint, api_key, DEFAULT_HTTP_TIMEOUT)
    }

    /// Client whose requests give up after `timeout`, including the wait
    /// for response headers.
    pub fn with_timeout(
        endpoint: Option<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed building estimator HTTP client")?;

        Ok(Self {
            http,
            endpoint,
            api_key,
        })
    }

    /// Client with no endpoint; every call fails with `NotConfigured`.
    pub fn disabled() -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: None,
            api_key: None,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Estimate emissions for a free-text description.
    pub async fn estimate(&self, description: &str) -> Result<EmissionEstimate, EstimatorError> {
        let endpoint = self.endpoint.as_deref().ok_or(EstimatorError::NotConfigured)?;

        let mut request = self
            .http
            .post(endpoint)
            .json(&EstimateRequest { description });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EstimatorError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        check_status(status, &body)?;
        parse_estimate(&body)
    }
}

/// Map non-success statuses to estimator errors.
fn check_status(status: u16, body: &str) -> Result<(), EstimatorError> {
    match status {
        200..=299 => Ok(()),
        429 => {
            tracing::warn!("Estimator rate limit hit (429)");
            Err(EstimatorError::RateLimited)
        }
        402 => {
            tracing::warn!("Estimator reports payment required (402)");
            Err(EstimatorError::PaymentRequired)
        }
        _ => Err(EstimatorError::Http(format!("HTTP {}: {}", status, body))),
    }
}

/// Parse and sanity-check an estimator response body.
fn parse_estimate(body: &str) -> Result<EmissionEstimate, EstimatorError> {
    let estimate: EmissionEstimate =
        serde_json::from_str(body).map_err(|e| EstimatorError::Malformed(e.to_string()))?;

    if !estimate.carbon_amount.is_finite() {
        return Err(EstimatorError::Malformed(
            "carbon_amount is not a finite number".to_string(),
        ));
    }

    Ok(estimate)
}
