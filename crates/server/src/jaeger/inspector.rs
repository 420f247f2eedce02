use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error};

use super::{summarize_trace, TraceQuery, TraceSource, TraceSummary};
use crate::kubernetes::ClusterInspector;
use crate::{Error, Result};

/// Result size for the slow trace search.
pub const SLOW_TRACE_LIMIT: u32 = 30;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TraceReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traces: Option<Vec<TraceSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traces_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TraceReport {
    fn unknown_service(service: &str) -> Self {
        Self {
            error: Some(format!("The service {} does not exist", service)),
            ..Default::default()
        }
    }

    fn empty(service: &str) -> Self {
        Self {
            service: Some(service.to_string()),
            traces: Some(Vec::new()),
            ..Default::default()
        }
    }
}

pub struct TraceInspector {
    source: Arc<dyn TraceSource>,
    cluster: Arc<ClusterInspector>,
    lookback: String,
    limit: u32,
}

impl TraceInspector {
    pub fn new(
        source: Arc<dyn TraceSource>,
        cluster: Arc<ClusterInspector>,
        lookback: impl Into<String>,
        limit: u32,
    ) -> Self {
        Self {
            source,
            cluster,
            lookback: lookback.into(),
            limit,
        }
    }

    /// Summaries of recent traces of a service.
    pub async fn processed_traces(&self, service: &str, only_errors: bool) -> TraceReport {
        let query = TraceQuery {
            service: service.to_string(),
            limit: self.limit,
            lookback: self.lookback.clone(),
            min_duration_ms: None,
            only_errors,
        };
        let empty_info = format!(
            "No traces found for service '{}' with lookback '{}'.",
            service, self.lookback
        );
        self.search(query, empty_info, |_| {}).await
    }

    /// Summaries of traces at least `min_duration_ms` long, slowest first.
    pub async fn slow_traces(&self, service: &str, min_duration_ms: f64, only_errors: bool) -> TraceReport {
        let query = TraceQuery {
            service: service.to_string(),
            limit: SLOW_TRACE_LIMIT,
            lookback: self.lookback.clone(),
            min_duration_ms: Some(min_duration_ms),
            only_errors,
        };
        let empty_info = format!(
            "No traces found for service '{}' with a minimum duration of {}ms in the last {}.",
            service, min_duration_ms, self.lookback
        );
        self.search(query, empty_info, |traces| {
            traces.sort_by(|a, b| b.latency_ms.total_cmp(&a.latency_ms))
        })
        .await
    }

    async fn search<F>(&self, query: TraceQuery, empty_info: String, order: F) -> TraceReport
    where
        F: FnOnce(&mut Vec<TraceSummary>),
    {
        let service = query.service.clone();
        if !self
            .cluster
            .services_in_all_namespaces()
            .await
            .iter()
            .any(|s| *s == service)
        {
            return TraceReport::unknown_service(&service);
        }

        let raw = match self.source.find_traces(query).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Failed to fetch traces for {}: {}", service, e);
                return TraceReport {
                    error: Some("Failed to fetch traces from Jaeger".to_string()),
                    ..TraceReport::empty(&service)
                };
            }
        };

        if raw.is_empty() {
            return TraceReport {
                info: Some(empty_info),
                ..TraceReport::empty(&service)
            };
        }

        let mut traces: Vec<TraceSummary> = raw.iter().filter_map(summarize_trace).collect();
        debug!("Summarized {} of {} trace(s) for {}", traces.len(), raw.len(), service);
        order(&mut traces);

        TraceReport {
            traces_count: Some(traces.len()),
            traces: Some(traces),
            ..TraceReport::empty(&service)
        }
    }

    /// The full trace document, or an error payload when it does not exist.
    pub async fn trace(&self, trace_id: &str) -> Result<Value> {
        validate_trace_id(trace_id)?;

        match self.source.trace(trace_id).await {
            Ok(Some(trace)) => Ok(trace),
            Ok(None) => Ok(json!({ "error": format!("Trace with ID '{}' not found", trace_id) })),
            Err(e) => {
                error!("Failed to fetch trace {}: {}", trace_id, e);
                Ok(json!({
                    "error": "Failed to fetch trace from Jaeger",
                    "trace_id": trace_id,
                }))
            }
        }
    }
}

/// Trace ids are 1 to 32 hex digits.
pub fn validate_trace_id(trace_id: &str) -> Result<()> {
    if trace_id.is_empty() || trace_id.len() > 32 || !trace_id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::Validation(format!(
            "trace_id must be 1 to 32 hexadecimal characters, got '{}'",
            trace_id
        )));
    }
    Ok(())
}
