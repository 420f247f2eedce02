pub mod cache;
pub mod config;
pub mod graph;
pub mod jaeger;
pub mod kubernetes;
pub mod metrics;
pub mod promql;
pub mod server;
pub mod tools;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Kubernetes error: {0}")]
    Kubernetes(#[from] kube::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Prometheus error: {0}")]
    Prometheus(String),
    #[error("Jaeger error: {0}")]
    Jaeger(String),
    #[error("Graph database error: {0}")]
    Graph(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<neo4rs::Error> for Error {
    fn from(e: neo4rs::Error) -> Self {
        Error::Graph(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_errors_keep_their_message() {
        let err = Error::Graph("connection refused".to_string());
        assert_eq!(err.to_string(), "Graph database error: connection refused");
    }
}
