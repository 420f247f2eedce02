use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::DependencyGraph;
use crate::cache::NameCache;
use crate::Result;

/// A graph answer for one service, or why there is none.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Lookup<T> {
    Found(T),
    Failed { error: String, service: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServicesUsed {
    pub service: String,
    pub services_used: Vec<String>,
    pub count: usize,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Dependencies {
    pub service: String,
    /// Dependency name to its node label, e.g. `redis-cart -> Database`
    pub dependencies: BTreeMap<String, String>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceSummary {
    pub service: String,
    pub summary: String,
}

/// Service-to-service calls and infrastructure dependencies from the graph
/// database.
pub struct ServiceMap {
    graph: Arc<dyn DependencyGraph>,
    services: NameCache,
}

impl ServiceMap {
    pub fn new(graph: Arc<dyn DependencyGraph>) -> Self {
        Self {
            graph,
            services: NameCache::new("graph services"),
        }
    }

    pub async fn services(&self) -> Vec<String> {
        self.services
            .get_or_load(|| self.graph.service_names())
            .await
    }

    pub async fn has_service(&self, service: &str) -> bool {
        self.services().await.iter().any(|s| s == service)
    }

    pub async fn refresh_cache(&self) {
        self.services.clear().await;
    }

    fn missing<T>(service: &str) -> Lookup<T> {
        Lookup::Failed {
            error: format!("The service {} doesn't exist in the cluster.", service),
            service: service.to_string(),
        }
    }

    pub async fn services_used_by(&self, service: &str) -> Result<Lookup<ServicesUsed>> {
        if !self.has_service(service).await {
            return Ok(Self::missing(service));
        }

        let services_used = self.graph.services_called_by(service).await?;
        debug!("Service {} calls {} service(s)", service, services_used.len());

        Ok(Lookup::Found(ServicesUsed {
            service: service.to_string(),
            count: services_used.len(),
            summary: format!(
                "Service '{}' uses {} other services to complete its tasks",
                service,
                services_used.len()
            ),
            services_used,
        }))
    }

    pub async fn dependencies(&self, service: &str) -> Result<Lookup<Dependencies>> {
        if !self.has_service(service).await {
            return Ok(Self::missing(service));
        }

        let dependencies: BTreeMap<String, String> =
            self.graph.dependencies_of(service).await?.into_iter().collect();

        if dependencies.is_empty() {
            warn!("No dependencies found for service {}", service);
            return Ok(Lookup::Failed {
                error: format!("The service {} has no dependencies", service),
                service: service.to_string(),
            });
        }

        Ok(Lookup::Found(Dependencies {
            service: service.to_string(),
            summary: format!(
                "Service '{}' has {} infrastructure dependencies",
                service,
                dependencies.len()
            ),
            dependencies,
        }))
    }

    /// A prose description of the service's calls and dependencies.
    pub async fn summary(&self, service: &str) -> Result<Lookup<ServiceSummary>> {
        let used = match self.services_used_by(service).await? {
            Lookup::Found(used) => used,
            Lookup::Failed { error, service } => return Ok(Lookup::Failed { error, service }),
        };

        let mut summary = if used.services_used.is_empty() {
            format!(
                "The service {} doesn't use any other services to complete its tasks.",
                service
            )
        } else {
            format!(
                "The service {} uses {} services to complete its tasks: {}.",
                service,
                used.count,
                used.services_used.join(", ")
            )
        };

        let dependencies = self.graph.dependencies_of(service).await?;
        if !dependencies.is_empty() {
            let listed: Vec<String> = dependencies
                .iter()
                .map(|(name, kind)| format!("{} ({})", name, kind))
                .collect();
            summary.push_str(&format!(
                " It has the following {} dependencies: {}.",
                listed.len(),
                listed.join(", ")
            ));
        }

        Ok(Lookup::Found(ServiceSummary {
            service: service.to_string(),
            summary,
        }))
    }
}
