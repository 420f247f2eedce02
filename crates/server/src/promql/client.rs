//! Prometheus HTTP API client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use super::{MetricsSource, RangeWindow, Sample, Series};
use crate::{Error, Result};

/// Client for `/api/v1/query` and `/api/v1/query_range`
pub struct PrometheusClient {
    prometheus_url: String,
    client: Client,
    timeout: Duration,
}

impl PrometheusClient {
    pub fn new(prometheus_url: impl Into<String>) -> Self {
        Self {
            prometheus_url: prometheus_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set query timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<PrometheusData> {
        let url = format!("{}{}", self.prometheus_url, path);
        debug!("Prometheus request {} {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .query(params)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Prometheus reports query errors as JSON even on 4xx
        let parsed: PrometheusResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(Error::Prometheus(format!("HTTP {}: {}", status, body)));
            }
            Err(e) => return Err(e.into()),
        };

        if parsed.status != "success" {
            return Err(Error::Prometheus(format!(
                "{}: {}",
                parsed.error_type.unwrap_or_else(|| "error".to_string()),
                parsed.error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }

        if let Some(warnings) = &parsed.warnings {
            warn!("Prometheus returned warnings for {}: {}", path, warnings.join("; "));
        }

        let data = parsed
            .data
            .ok_or_else(|| Error::Prometheus("response carries no data".to_string()))?;
        debug!("Prometheus returned {} {} result(s)", data.result.len(), data.result_type);
        Ok(data)
    }
}

#[async_trait]
impl MetricsSource for PrometheusClient {
    async fn instant(&self, query: &str) -> Result<Vec<Sample>> {
        let data = self.get("/api/v1/query", &[("query", query)]).await?;
        data.result
            .into_iter()
            .filter_map(|r| r.value.map(|v| (r.metric, v)))
            .map(|(metric, (_, value))| {
                Ok(Sample {
                    metric,
                    value: parse_sample_value(&value)?,
                })
            })
            .collect()
    }

    async fn range(&self, query: &str, window: RangeWindow) -> Result<Vec<Series>> {
        let start = window.start.timestamp().to_string();
        let end = window.end.timestamp().to_string();
        let data = self
            .get(
                "/api/v1/query_range",
                &[
                    ("query", query),
                    ("start", start.as_str()),
                    ("end", end.as_str()),
                    ("step", window.step.as_str()),
                ],
            )
            .await?;

        data.result
            .into_iter()
            .map(|r| {
                let values = r
                    .values
                    .unwrap_or_default()
                    .iter()
                    .map(|(ts, v)| Ok((*ts, parse_sample_value(v)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Series {
                    metric: r.metric,
                    values,
                })
            })
            .collect()
    }
}

/// Prometheus encodes sample values as strings, including `NaN` and `+Inf`.
pub fn parse_sample_value(raw: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|_| Error::Prometheus(format!("invalid sample value '{}'", raw)))
}

#[derive(Debug, Serialize, Deserialize)]
struct PrometheusResponse {
    status: String,
    #[serde(default)]
    data: Option<PrometheusData>,
    #[serde(rename = "errorType", default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PrometheusData {
    #[serde(rename = "resultType")]
    result_type: String,
    result: Vec<PrometheusResult>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PrometheusResult {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    value: Option<(f64, String)>,
    values: Option<Vec<(f64, String)>>,
}
