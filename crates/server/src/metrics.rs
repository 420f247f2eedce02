use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry, Encoder,
    HistogramVec, IntCounterVec, Registry, TextEncoder,
};
use std::time::Duration;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref TOOL_CALLS_TOTAL: IntCounterVec = register_int_counter_vec_with_registry!(
        "cluster_insight_tool_calls_total",
        "Total number of tool calls, by tool and outcome.",
        &["tool", "outcome"],
        REGISTRY
    )
    .unwrap();
    pub static ref TOOL_CALL_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        "cluster_insight_tool_call_duration_seconds",
        "Time spent answering a tool call.",
        &["tool"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
        REGISTRY
    )
    .unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    ToolError,
    Unknown,
}

impl Outcome {
    fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::ToolError => "error",
            Outcome::Unknown => "unknown_tool",
        }
    }
}

/// Count a tool call. Unknown tool names share one `unknown` label value so
/// clients cannot grow the series set.
pub fn record_tool_call(tool: &str, outcome: Outcome, elapsed: Duration) {
    let tool = if outcome == Outcome::Unknown { "unknown" } else { tool };
    TOOL_CALLS_TOTAL
        .with_label_values(&[tool, outcome.as_str()])
        .inc();
    if outcome != Outcome::Unknown {
        TOOL_CALL_DURATION
            .with_label_values(&[tool])
            .observe(elapsed.as_secs_f64());
    }
}

// Function to gather metrics for exposition
pub fn gather_metrics() -> crate::Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| crate::Error::Internal(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| crate::Error::Internal(format!("Failed to convert metrics to string: {}", e)))
}
