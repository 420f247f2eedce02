//! The tools exposed to agents.
//!
//! Each tool takes a JSON object of arguments, described by a JSON Schema
//! derived from its typed argument struct, and answers with JSON or plain
//! text. Lookups that find nothing answer normally with an `error` field;
//! only bad arguments and unreachable backends fail the call.

mod cluster;
mod graph;
mod metrics;
mod traces;

pub use cluster::{ClusterOverview, GetClusterOverview, GetLogs, GetPodsFromService, GetProblematicPods, RefreshCache};
pub use graph::{GetDependencies, GetServiceSummary, GetServicesUsedBy};
pub use metrics::{GetMetrics, GetMetricsRange, GetPodTriage};
pub use traces::{GetSlowTraces, GetTrace, GetTraces};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::Config;
use crate::graph::{DependencyGraph, Neo4jGraph, ServiceMap};
use crate::jaeger::{JaegerClient, TraceInspector, TraceSource};
use crate::kubernetes::{ClusterInspector, KubeBackend, KubeClient};
use crate::metrics::{record_tool_call, Outcome};
use crate::promql::{MetricsInspector, MetricsSource, PrometheusClient};
use crate::{Error, Result};

/// What a tool answers with.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Json(Value),
    Text(String),
}

impl ToolOutput {
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// Text rendering; JSON is pretty-printed.
    pub fn to_text(&self) -> String {
        match self {
            Self::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            Self::Text(text) => text.clone(),
        }
    }

    pub fn structured(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    /// Human-readable display name
    fn title(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON Schema of the accepted arguments object
    fn input_schema(&self) -> Value;

    async fn call(&self, args: Value) -> Result<ToolOutput>;
}

/// Tool arguments for tools that take none.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct NoArgs {}

/// The kind of resource a pod-or-service tool reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Pod,
    Service,
}

fn require_positive(field: &str, value: i64) -> Result<()> {
    if value < 1 {
        return Err(Error::Validation(format!("{} must be at least 1, got {}", field, value)));
    }
    Ok(())
}

/// JSON Schema for an argument struct.
pub fn schema_for<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|_| json!({ "type": "object" }))
}

/// Decode an arguments object; a missing object counts as empty.
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| Error::Validation(format!("invalid arguments: {}", e)))
}

/// Everything the tools read from, one inspector per backend.
#[derive(Clone)]
pub struct Inspectors {
    pub cluster: Arc<ClusterInspector>,
    pub metrics: Arc<MetricsInspector>,
    pub traces: Arc<TraceInspector>,
    pub service_map: Arc<ServiceMap>,
}

impl Inspectors {
    pub fn new(
        kube: Arc<dyn KubeBackend>,
        prometheus: Arc<dyn MetricsSource>,
        jaeger: Arc<dyn TraceSource>,
        graph: Arc<dyn DependencyGraph>,
        config: &Config,
    ) -> Self {
        let cluster = Arc::new(ClusterInspector::new(kube, config.kube.namespace.clone()));
        Self {
            metrics: Arc::new(MetricsInspector::new(prometheus, cluster.clone())),
            traces: Arc::new(TraceInspector::new(
                jaeger,
                cluster.clone(),
                config.jaeger.lookback.clone(),
                config.jaeger.limit,
            )),
            service_map: Arc::new(ServiceMap::new(graph)),
            cluster,
        }
    }

    /// Connect the real backends described by the configuration.
    pub async fn connect(config: &Config) -> Result<Self> {
        let kube = KubeClient::new().await?;
        let prometheus = PrometheusClient::new(config.prometheus.url.clone())
            .with_timeout(config.prometheus.timeout);
        let jaeger = JaegerClient::new(config.jaeger.url.clone()).with_timeout(config.jaeger.timeout);
        let graph = Neo4jGraph::new(config.neo4j.clone());

        Ok(Self::new(
            Arc::new(kube),
            Arc::new(prometheus),
            Arc::new(jaeger),
            Arc::new(graph),
            config,
        ))
    }
}

/// The tool catalogue, in listing order.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new(inspectors: &Inspectors) -> Self {
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(GetMetrics::new(inspectors.metrics.clone())),
            Arc::new(GetMetricsRange::new(inspectors.metrics.clone())),
            Arc::new(GetPodsFromService::new(inspectors.cluster.clone())),
            Arc::new(GetClusterOverview::new(inspectors.cluster.clone())),
            Arc::new(GetProblematicPods::new(inspectors.cluster.clone())),
            Arc::new(GetPodTriage::new(inspectors.metrics.clone())),
            Arc::new(GetServicesUsedBy::new(inspectors.service_map.clone())),
            Arc::new(GetDependencies::new(inspectors.service_map.clone())),
            Arc::new(GetServiceSummary::new(inspectors.service_map.clone())),
            Arc::new(GetLogs::new(inspectors.cluster.clone())),
            Arc::new(GetTraces::new(inspectors.traces.clone())),
            Arc::new(GetSlowTraces::new(inspectors.traces.clone())),
            Arc::new(GetTrace::new(inspectors.traces.clone())),
            Arc::new(RefreshCache::new(
                inspectors.cluster.clone(),
                inspectors.service_map.clone(),
            )),
        ];
        Self { tools }
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Run a tool by name, recording the outcome in the self metrics.
    pub async fn call(&self, name: &str, args: Value) -> Result<ToolOutput> {
        let started = Instant::now();
        let Some(tool) = self.get(name) else {
            warn!("Unknown tool requested: {}", name);
            record_tool_call(name, Outcome::Unknown, started.elapsed());
            return Err(Error::NotFound(format!("Unknown tool: {}", name)));
        };

        info!("Calling tool {}", name);
        let result = tool.call(args).await;
        let outcome = if result.is_ok() {
            Outcome::Success
        } else {
            Outcome::ToolError
        };
        record_tool_call(name, outcome, started.elapsed());
        result
    }
}
