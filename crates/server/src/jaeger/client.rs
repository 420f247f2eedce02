//! Jaeger query service HTTP client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::model::{JaegerResponse, Trace};
use super::{TraceQuery, TraceSource};
use crate::{Error, Result};

const ERROR_TAG_FILTER: &str = r#"{"error":"true"}"#;

pub struct JaegerClient {
    jaeger_url: String,
    client: Client,
    timeout: Duration,
}

impl JaegerClient {
    pub fn new(jaeger_url: impl Into<String>) -> Self {
        Self {
            jaeger_url: jaeger_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// GET a query API path. `Ok(None)` means the resource does not exist.
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Option<Vec<T>>> {
        let url = format!("{}{}", self.jaeger_url, path);
        debug!("Jaeger request {} {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .query(params)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Jaeger(format!("HTTP {}: {}", status, body)));
        }

        let parsed: JaegerResponse<T> = response.json().await?;
        if let Some(errors) = parsed.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<String> = errors
                .iter()
                .map(|e| format!("{} ({})", e.msg, e.code))
                .collect();
            warn!("Jaeger returned errors for {}: {}", path, messages.join("; "));
            if parsed.data.as_ref().map_or(true, |d| d.is_empty()) {
                return Err(Error::Jaeger(messages.join("; ")));
            }
        }

        Ok(parsed.data)
    }
}

/// Query parameters for `/api/traces`.
pub fn search_params(query: &TraceQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("service", query.service.clone()),
        ("limit", query.limit.to_string()),
        ("lookback", query.lookback.clone()),
    ];
    if let Some(min) = query.min_duration_ms {
        params.push(("minDuration", format!("{}ms", min as u64)));
    }
    if query.only_errors {
        params.push(("tags", ERROR_TAG_FILTER.to_string()));
    }
    params
}

#[async_trait]
impl TraceSource for JaegerClient {
    async fn find_traces(&self, query: TraceQuery) -> Result<Vec<Trace>> {
        let traces = self
            .get::<Trace>("/api/traces", &search_params(&query))
            .await?
            .unwrap_or_default();
        debug!("Jaeger returned {} trace(s) for {}", traces.len(), query.service);
        Ok(traces)
    }

    async fn trace(&self, trace_id: &str) -> Result<Option<Value>> {
        let data = self
            .get::<Value>(&format!("/api/traces/{}", trace_id), &[])
            .await?;
        Ok(data.and_then(|traces| traces.into_iter().next()))
    }
}
