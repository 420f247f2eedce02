//! Distributed traces from the Jaeger query service.

mod client;
mod inspector;
pub mod model;
mod summary;

pub use client::{search_params, JaegerClient};
pub use inspector::{validate_trace_id, TraceInspector, TraceReport, SLOW_TRACE_LIMIT};
pub use model::Trace;
pub use summary::{service_sequence, summarize_trace, TraceSummary};

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;

/// Search criteria for `/api/traces`.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceQuery {
    pub service: String,
    pub limit: u32,
    /// Jaeger duration string such as `15m` or `1h`
    pub lookback: String,
    pub min_duration_ms: Option<f64>,
    pub only_errors: bool,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TraceSource: Send + Sync {
    async fn find_traces(&self, query: TraceQuery) -> Result<Vec<Trace>>;

    /// The raw trace document, `None` when Jaeger does not know the id.
    async fn trace(&self, trace_id: &str) -> Result<Option<Value>>;
}
