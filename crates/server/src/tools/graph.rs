use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::{parse_args, schema_for, Tool, ToolOutput};
use crate::graph::ServiceMap;
use crate::Result;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GraphServiceArgs {
    /// Service name as stored in the service graph
    pub service: String,
}

pub struct GetServicesUsedBy {
    service_map: Arc<ServiceMap>,
}

impl GetServicesUsedBy {
    pub fn new(service_map: Arc<ServiceMap>) -> Self {
        Self { service_map }
    }
}

#[async_trait]
impl Tool for GetServicesUsedBy {
    fn name(&self) -> &'static str {
        "get_services_used_by"
    }

    fn title(&self) -> &'static str {
        "Services called by a service"
    }

    fn description(&self) -> &'static str {
        "The services a service calls to complete its tasks. A failure in any of them can \
         surface as errors or latency in the caller."
    }

    fn input_schema(&self) -> Value {
        schema_for::<GraphServiceArgs>()
    }

    async fn call(&self, args: Value) -> Result<ToolOutput> {
        let args: GraphServiceArgs = parse_args(args)?;
        ToolOutput::json(&self.service_map.services_used_by(&args.service).await?)
    }
}

pub struct GetDependencies {
    service_map: Arc<ServiceMap>,
}

impl GetDependencies {
    pub fn new(service_map: Arc<ServiceMap>) -> Self {
        Self { service_map }
    }
}

#[async_trait]
impl Tool for GetDependencies {
    fn name(&self) -> &'static str {
        "get_dependencies"
    }

    fn title(&self) -> &'static str {
        "Infrastructure dependencies"
    }

    fn description(&self) -> &'static str {
        "The infrastructure a service depends on, such as databases, caches and queues, with the type of each."
    }

    fn input_schema(&self) -> Value {
        schema_for::<GraphServiceArgs>()
    }

    async fn call(&self, args: Value) -> Result<ToolOutput> {
        let args: GraphServiceArgs = parse_args(args)?;
        ToolOutput::json(&self.service_map.dependencies(&args.service).await?)
    }
}

pub struct GetServiceSummary {
    service_map: Arc<ServiceMap>,
}

impl GetServiceSummary {
    pub fn new(service_map: Arc<ServiceMap>) -> Self {
        Self { service_map }
    }
}

#[async_trait]
impl Tool for GetServiceSummary {
    fn name(&self) -> &'static str {
        "get_service_summary"
    }

    fn title(&self) -> &'static str {
        "Service summary"
    }

    fn description(&self) -> &'static str {
        "A short description of which services a service calls and what infrastructure it depends on."
    }

    fn input_schema(&self) -> Value {
        schema_for::<GraphServiceArgs>()
    }

    async fn call(&self, args: Value) -> Result<ToolOutput> {
        let args: GraphServiceArgs = parse_args(args)?;
        ToolOutput::json(&self.service_map.summary(&args.service).await?)
    }
}
