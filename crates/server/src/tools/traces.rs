use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::{parse_args, schema_for, Tool, ToolOutput};
use crate::jaeger::TraceInspector;
use crate::{Error, Result};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TracesArgs {
    /// Service name as reported to Jaeger
    pub service_name: String,
    /// Only return traces that contain a failed span
    #[serde(default)]
    pub only_errors: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SlowTracesArgs {
    /// Service name as reported to Jaeger
    pub service_name: String,
    /// Minimum trace duration in milliseconds
    pub min_duration_ms: f64,
    #[serde(default)]
    pub only_errors: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TraceArgs {
    /// Hexadecimal trace id
    pub trace_id: String,
}

pub struct GetTraces {
    traces: Arc<TraceInspector>,
}

impl GetTraces {
    pub fn new(traces: Arc<TraceInspector>) -> Self {
        Self { traces }
    }
}

#[async_trait]
impl Tool for GetTraces {
    fn name(&self) -> &'static str {
        "get_traces"
    }

    fn title(&self) -> &'static str {
        "Recent traces"
    }

    fn description(&self) -> &'static str {
        "Summaries of recent traces of a service: trace id, latency, whether it failed with the \
         error messages, and the sequence of services it went through."
    }

    fn input_schema(&self) -> Value {
        schema_for::<TracesArgs>()
    }

    async fn call(&self, args: Value) -> Result<ToolOutput> {
        let args: TracesArgs = parse_args(args)?;
        ToolOutput::json(
            &self
                .traces
                .processed_traces(&args.service_name, args.only_errors)
                .await,
        )
    }
}

pub struct GetSlowTraces {
    traces: Arc<TraceInspector>,
}

impl GetSlowTraces {
    pub fn new(traces: Arc<TraceInspector>) -> Self {
        Self { traces }
    }
}

#[async_trait]
impl Tool for GetSlowTraces {
    fn name(&self) -> &'static str {
        "get_slow_traces"
    }

    fn title(&self) -> &'static str {
        "Slow traces"
    }

    fn description(&self) -> &'static str {
        "Summaries of recent traces of a service that took at least min_duration_ms, slowest first."
    }

    fn input_schema(&self) -> Value {
        schema_for::<SlowTracesArgs>()
    }

    async fn call(&self, args: Value) -> Result<ToolOutput> {
        let args: SlowTracesArgs = parse_args(args)?;
        if !(args.min_duration_ms.is_finite() && args.min_duration_ms > 0.0) {
            return Err(Error::Validation(format!(
                "min_duration_ms must be greater than 0, got {}",
                args.min_duration_ms
            )));
        }
        ToolOutput::json(
            &self
                .traces
                .slow_traces(&args.service_name, args.min_duration_ms, args.only_errors)
                .await,
        )
    }
}

pub struct GetTrace {
    traces: Arc<TraceInspector>,
}

impl GetTrace {
    pub fn new(traces: Arc<TraceInspector>) -> Self {
        Self { traces }
    }
}

#[async_trait]
impl Tool for GetTrace {
    fn name(&self) -> &'static str {
        "get_trace"
    }

    fn title(&self) -> &'static str {
        "Trace details"
    }

    fn description(&self) -> &'static str {
        "The complete Jaeger document of one trace, with every span, tag and log."
    }

    fn input_schema(&self) -> Value {
        schema_for::<TraceArgs>()
    }

    async fn call(&self, args: Value) -> Result<ToolOutput> {
        let args: TraceArgs = parse_args(args)?;
        Ok(ToolOutput::Json(self.traces.trace(&args.trace_id).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::Mocks;
    use serde_json::json;

    #[tokio::test]
    async fn slow_traces_need_positive_duration() {
        let inspectors = Mocks::new().inspectors();
        let tool = GetSlowTraces::new(inspectors.traces);
        for bad in [json!(0), json!(-5.5)] {
            let err = tool
                .call(json!({"service_name": "frontend", "min_duration_ms": bad}))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
    }

    #[tokio::test]
    async fn trace_document_passes_through() {
        let mut mocks = Mocks::new();
        mocks
            .jaeger
            .expect_trace()
            .returning(|id| Ok(Some(json!({"traceID": id, "spans": []}))));

        let output = GetTrace::new(mocks.inspectors().traces)
            .call(json!({"trace_id": "4bf92f3577b34da6"}))
            .await
            .unwrap();
        assert_eq!(output.structured().unwrap()["traceID"], "4bf92f3577b34da6");
    }

    #[tokio::test]
    async fn traces_of_unknown_service() {
        let mut mocks = Mocks::new();
        mocks
            .kube
            .expect_all_service_names()
            .returning(|| Ok(vec!["frontend".to_string()]));
        mocks.jaeger.expect_find_traces().never();

        let output = GetTraces::new(mocks.inspectors().traces)
            .call(json!({"service_name": "payments"}))
            .await
            .unwrap();
        assert_eq!(
            output.structured().unwrap(),
            &json!({"error": "The service payments does not exist"})
        );
    }
}
