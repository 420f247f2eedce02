//! Neo4j-backed service graph.

use async_trait::async_trait;
use neo4rs::{query, Graph, Query, Row};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::DependencyGraph;
use crate::config::Neo4jConfig;
use crate::{Error, Result};

const SERVICE_NAMES: &str = "MATCH (s:Service) RETURN s.name AS name";
const SERVICES_CALLED_BY: &str =
    "MATCH (s:Service {name: $service_name})-[:CALLS]->(c:Service) RETURN c.name AS name";
const DEPENDENCIES_OF: &str = "MATCH (s:Service {name: $service_name})-[:USES]->(dependency) \
     RETURN dependency.name AS name, labels(dependency)[0] AS type";
const DROP_ALL: &str = "MATCH (n) DETACH DELETE n";

/// Connects on first use so the server starts without a reachable database.
pub struct Neo4jGraph {
    config: Neo4jConfig,
    graph: OnceCell<Graph>,
}

impl Neo4jGraph {
    pub fn new(config: Neo4jConfig) -> Self {
        Self {
            config,
            graph: OnceCell::new(),
        }
    }

    async fn graph(&self) -> Result<&Graph> {
        self.graph
            .get_or_try_init(|| async {
                info!("Connecting to Neo4j at {}", self.config.uri);
                let graph = Graph::new(
                    self.config.uri.as_str(),
                    self.config.user.as_str(),
                    self.config.password.as_str(),
                )
                .await?;
                Ok::<_, Error>(graph)
            })
            .await
    }

    async fn rows(&self, q: Query) -> Result<Vec<Row>> {
        let mut stream = self.graph().await?.execute(q).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    async fn names(&self, q: Query) -> Result<Vec<String>> {
        self.rows(q)
            .await?
            .iter()
            .map(|row| column(row, "name"))
            .collect()
    }

    /// Execute each `;`-separated statement of a Cypher script in order.
    /// Returns the number of statements run.
    pub async fn run_script(&self, script: &str) -> Result<usize> {
        let graph = self.graph().await?;
        let statements = split_statements(script);
        for (i, statement) in statements.iter().enumerate() {
            debug!("Running statement {} of {}", i + 1, statements.len());
            graph.run(query(statement)).await?;
        }
        Ok(statements.len())
    }

    /// Delete every node and relationship.
    pub async fn drop_all(&self) -> Result<()> {
        self.graph().await?.run(query(DROP_ALL)).await?;
        Ok(())
    }
}

fn column(row: &Row, key: &str) -> Result<String> {
    row.get::<String>(key)
        .map_err(|e| Error::Graph(format!("column '{}': {}", key, e)))
}

/// Non-empty statements of a script, trimmed.
pub fn split_statements(script: &str) -> Vec<&str> {
    script
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[async_trait]
impl DependencyGraph for Neo4jGraph {
    async fn service_names(&self) -> Result<Vec<String>> {
        self.names(query(SERVICE_NAMES)).await
    }

    async fn services_called_by(&self, service: &str) -> Result<Vec<String>> {
        self.names(query(SERVICES_CALLED_BY).param("service_name", service.to_string()))
            .await
    }

    async fn dependencies_of(&self, service: &str) -> Result<Vec<(String, String)>> {
        self.rows(query(DEPENDENCIES_OF).param("service_name", service.to_string()))
            .await?
            .iter()
            .map(|row| Ok((column(row, "name")?, column(row, "type")?)))
            .collect()
    }
}
