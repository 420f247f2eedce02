use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::{parse_args, require_positive, schema_for, ResourceType, Tool, ToolOutput};
use crate::promql::{MetricsInspector, DEFAULT_STEP};
use crate::Result;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MetricsArgs {
    /// Name of the pod or service
    pub resource_name: String,
    pub resource_type: ResourceType,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MetricsRangeArgs {
    /// Name of the pod or service
    pub resource_name: String,
    pub resource_type: ResourceType,
    /// How far back to look, in minutes
    pub time_range_minutes: i64,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PodArgs {
    /// Name of the pod
    pub pod_name: String,
}

pub struct GetMetrics {
    metrics: Arc<MetricsInspector>,
}

impl GetMetrics {
    pub fn new(metrics: Arc<MetricsInspector>) -> Self {
        Self { metrics }
    }
}

#[async_trait]
impl Tool for GetMetrics {
    fn name(&self) -> &'static str {
        "get_metrics"
    }

    fn title(&self) -> &'static str {
        "Current container metrics"
    }

    fn description(&self) -> &'static str {
        "Current values of the container CPU, memory, network and thread metrics of a pod, \
         or of every pod behind a service. Metrics with no data are null."
    }

    fn input_schema(&self) -> Value {
        schema_for::<MetricsArgs>()
    }

    async fn call(&self, args: Value) -> Result<ToolOutput> {
        let args: MetricsArgs = parse_args(args)?;
        match args.resource_type {
            ResourceType::Pod => ToolOutput::json(&self.metrics.pod_metrics(&args.resource_name).await),
            ResourceType::Service => {
                ToolOutput::json(&self.metrics.service_metrics(&args.resource_name).await)
            }
        }
    }
}

pub struct GetMetricsRange {
    metrics: Arc<MetricsInspector>,
}

impl GetMetricsRange {
    pub fn new(metrics: Arc<MetricsInspector>) -> Self {
        Self { metrics }
    }
}

#[async_trait]
impl Tool for GetMetricsRange {
    fn name(&self) -> &'static str {
        "get_metrics_range"
    }

    fn title(&self) -> &'static str {
        "Container metric history"
    }

    fn description(&self) -> &'static str {
        "Per-minute values of the container metrics of a pod, or of every pod behind a service, \
         over the last time_range_minutes minutes. Useful to spot trends such as memory growth."
    }

    fn input_schema(&self) -> Value {
        schema_for::<MetricsRangeArgs>()
    }

    async fn call(&self, args: Value) -> Result<ToolOutput> {
        let args: MetricsRangeArgs = parse_args(args)?;
        require_positive("time_range_minutes", args.time_range_minutes)?;
        let minutes = u32::try_from(args.time_range_minutes).unwrap_or(u32::MAX);

        match args.resource_type {
            ResourceType::Pod => ToolOutput::json(
                &self
                    .metrics
                    .pod_metrics_range(&args.resource_name, minutes, DEFAULT_STEP)
                    .await,
            ),
            ResourceType::Service => ToolOutput::json(
                &self
                    .metrics
                    .service_metrics_range(&args.resource_name, minutes)
                    .await,
            ),
        }
    }
}

pub struct GetPodTriage {
    metrics: Arc<MetricsInspector>,
}

impl GetPodTriage {
    pub fn new(metrics: Arc<MetricsInspector>) -> Self {
        Self { metrics }
    }
}

#[async_trait]
impl Tool for GetPodTriage {
    fn name(&self) -> &'static str {
        "get_pod_triage"
    }

    fn title(&self) -> &'static str {
        "Pod metric triage"
    }

    fn description(&self) -> &'static str {
        "Quick anomaly check of a pod's current metrics: thread saturation, CPU load and \
         network errors. Returns whether the pod looks anomalous and why."
    }

    fn input_schema(&self) -> Value {
        schema_for::<PodArgs>()
    }

    async fn call(&self, args: Value) -> Result<ToolOutput> {
        let args: PodArgs = parse_args(args)?;
        ToolOutput::json(&self.metrics.pod_triage(&args.pod_name).await)
    }
}
