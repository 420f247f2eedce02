//! Service dependency graph stored in Neo4j.
//!
//! `Service` nodes are linked by `CALLS` relationships to the services they
//! call and by `USES` relationships to infrastructure nodes (databases,
//! caches, queues) whose label names the dependency type.

mod neo4j;
mod service_map;

pub use neo4j::{split_statements, Neo4jGraph};
pub use service_map::{Dependencies, Lookup, ServiceMap, ServiceSummary, ServicesUsed};

use async_trait::async_trait;

use crate::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DependencyGraph: Send + Sync {
    async fn service_names(&self) -> Result<Vec<String>>;

    async fn services_called_by(&self, service: &str) -> Result<Vec<String>>;

    /// `(name, type)` pairs of the service's infrastructure dependencies.
    async fn dependencies_of(&self, service: &str) -> Result<Vec<(String, String)>>;
}
