use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use super::{parse_args, require_positive, schema_for, NoArgs, ResourceType, Tool, ToolOutput};
use crate::graph::ServiceMap;
use crate::kubernetes::ClusterInspector;
use crate::Result;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ServiceArgs {
    /// Name of the Kubernetes service
    pub service_name: String,
}

pub struct GetPodsFromService {
    cluster: Arc<ClusterInspector>,
}

impl GetPodsFromService {
    pub fn new(cluster: Arc<ClusterInspector>) -> Self {
        Self { cluster }
    }
}

#[async_trait]
impl Tool for GetPodsFromService {
    fn name(&self) -> &'static str {
        "get_pods_from_service"
    }

    fn title(&self) -> &'static str {
        "Pods of a service"
    }

    fn description(&self) -> &'static str {
        "List the pods selected by a service in the target namespace, with each pod's phase."
    }

    fn input_schema(&self) -> Value {
        schema_for::<ServiceArgs>()
    }

    async fn call(&self, args: Value) -> Result<ToolOutput> {
        let args: ServiceArgs = parse_args(args)?;
        ToolOutput::json(&self.cluster.pods_from_service(&args.service_name).await)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClusterOverview {
    pub namespace: String,
    pub pods: Vec<String>,
    pub services: Vec<String>,
    pub summary: String,
}

pub struct GetClusterOverview {
    cluster: Arc<ClusterInspector>,
}

impl GetClusterOverview {
    pub fn new(cluster: Arc<ClusterInspector>) -> Self {
        Self { cluster }
    }
}

#[async_trait]
impl Tool for GetClusterOverview {
    fn name(&self) -> &'static str {
        "get_cluster_overview"
    }

    fn title(&self) -> &'static str {
        "Cluster overview"
    }

    fn description(&self) -> &'static str {
        "Names of every pod and service in the target namespace. A good first call to learn what is running."
    }

    fn input_schema(&self) -> Value {
        schema_for::<NoArgs>()
    }

    async fn call(&self, args: Value) -> Result<ToolOutput> {
        let _: NoArgs = parse_args(args)?;
        let pods = self.cluster.pods().await;
        let services = self.cluster.services().await;
        let namespace = self.cluster.namespace().to_string();

        ToolOutput::json(&ClusterOverview {
            summary: format!(
                "Found {} pods and {} services in namespace '{}'",
                pods.len(),
                services.len(),
                namespace
            ),
            namespace,
            pods,
            services,
        })
    }
}

pub struct GetProblematicPods {
    cluster: Arc<ClusterInspector>,
}

impl GetProblematicPods {
    pub fn new(cluster: Arc<ClusterInspector>) -> Self {
        Self { cluster }
    }
}

#[async_trait]
impl Tool for GetProblematicPods {
    fn name(&self) -> &'static str {
        "get_problematic_pods"
    }

    fn title(&self) -> &'static str {
        "Problematic pods"
    }

    fn description(&self) -> &'static str {
        "Pods in the target namespace that are pending, have containers stuck waiting, \
         containers that exited with an error, or containers restarting repeatedly."
    }

    fn input_schema(&self) -> Value {
        schema_for::<NoArgs>()
    }

    async fn call(&self, args: Value) -> Result<ToolOutput> {
        let _: NoArgs = parse_args(args)?;
        ToolOutput::json(&self.cluster.problematic_pods().await)
    }
}

fn default_tail() -> i64 {
    100
}

fn default_important() -> bool {
    true
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LogsArgs {
    /// Name of the pod or service
    pub resource_name: String,
    pub resource_type: ResourceType,
    /// Number of most recent lines to fetch per pod
    #[serde(default = "default_tail")]
    pub tail: i64,
    /// Keep only lines that mention errors, failures, timeouts or HTTP error
    /// statuses
    #[serde(default = "default_important")]
    pub important: bool,
}

pub struct GetLogs {
    cluster: Arc<ClusterInspector>,
}

impl GetLogs {
    pub fn new(cluster: Arc<ClusterInspector>) -> Self {
        Self { cluster }
    }
}

#[async_trait]
impl Tool for GetLogs {
    fn name(&self) -> &'static str {
        "get_logs"
    }

    fn title(&self) -> &'static str {
        "Pod or service logs"
    }

    fn description(&self) -> &'static str {
        "Recent log lines of a pod, or of every pod behind a service. By default only \
         important lines are kept; if none are found the full tail is returned."
    }

    fn input_schema(&self) -> Value {
        schema_for::<LogsArgs>()
    }

    async fn call(&self, args: Value) -> Result<ToolOutput> {
        let args: LogsArgs = parse_args(args)?;
        require_positive("tail", args.tail)?;

        let logs = match args.resource_type {
            ResourceType::Pod => {
                self.cluster
                    .pod_logs(&args.resource_name, args.tail, args.important)
                    .await
            }
            ResourceType::Service => {
                self.cluster
                    .service_logs(&args.resource_name, args.tail, args.important)
                    .await
            }
        };
        Ok(ToolOutput::Text(logs))
    }
}

pub struct RefreshCache {
    cluster: Arc<ClusterInspector>,
    service_map: Arc<ServiceMap>,
}

impl RefreshCache {
    pub fn new(cluster: Arc<ClusterInspector>, service_map: Arc<ServiceMap>) -> Self {
        Self { cluster, service_map }
    }
}

#[async_trait]
impl Tool for RefreshCache {
    fn name(&self) -> &'static str {
        "refresh_cache"
    }

    fn title(&self) -> &'static str {
        "Refresh cached names"
    }

    fn description(&self) -> &'static str {
        "Forget the cached pod and service names so the next call sees pods and services created since."
    }

    fn input_schema(&self) -> Value {
        schema_for::<NoArgs>()
    }

    async fn call(&self, args: Value) -> Result<ToolOutput> {
        let _: NoArgs = parse_args(args)?;
        self.cluster.refresh_cache().await;
        self.service_map.refresh_cache().await;
        debug!("Name caches cleared");
        ToolOutput::json(&json!({ "status": "Cache refreshed" }))
    }
}
