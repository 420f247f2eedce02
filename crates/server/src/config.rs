use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub kube: KubeConfig,
    pub prometheus: PrometheusConfig,
    pub jaeger: JaegerConfig,
    pub neo4j: Neo4jConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KubeConfig {
    pub namespace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    pub url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JaegerConfig {
    pub url: String,
    pub timeout: Duration,
    /// Jaeger lookback window, e.g. "15m" or "1h"
    pub lookback: String,
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists; variables
        // that are already set are not overridden
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup, falling back to
    /// defaults for anything missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let timeout_secs: u64 = parse_positive("BACKEND_TIMEOUT_SECS", &var("BACKEND_TIMEOUT_SECS", "30"))?;
        let timeout = Duration::from_secs(timeout_secs);

        let config = Config {
            server: ServerConfig {
                addr: var("SERVER_ADDR", "0.0.0.0:8000"),
            },
            kube: KubeConfig {
                namespace: var("TARGET_NAMESPACE", "default"),
            },
            prometheus: PrometheusConfig {
                url: var("PROMETHEUS_SERVER_URL", "http://localhost:9090"),
                timeout,
            },
            jaeger: JaegerConfig {
                url: var("JAEGER_URL", "http://localhost:16686"),
                timeout,
                lookback: var("TRACE_LOOKBACK", "15m"),
                limit: parse_positive("TRACE_LIMIT", &var("TRACE_LIMIT", "20"))?,
            },
            neo4j: Neo4jConfig {
                uri: var("NEO4J_URI", "bolt://localhost:7687"),
                user: var("NEO4J_USER", "neo4j"),
                password: var("NEO4J_PASSWORD", "neo4j"),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.kube.namespace.trim().is_empty() {
            return Err(Error::Config("TARGET_NAMESPACE must not be empty".to_string()));
        }

        check_url("PROMETHEUS_SERVER_URL", &self.prometheus.url, &["http", "https"])?;
        check_url("JAEGER_URL", &self.jaeger.url, &["http", "https"])?;
        check_url(
            "NEO4J_URI",
            &self.neo4j.uri,
            &["bolt", "bolt+s", "bolt+ssc", "neo4j", "neo4j+s", "neo4j+ssc"],
        )?;

        if self.neo4j.password == "neo4j" {
            tracing::warn!("NEO4J_PASSWORD is the default value. Graph queries may be rejected.");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        let timeout = Duration::from_secs(30);
        Self {
            server: ServerConfig {
                addr: "0.0.0.0:8000".to_string(),
            },
            kube: KubeConfig {
                namespace: "default".to_string(),
            },
            prometheus: PrometheusConfig {
                url: "http://localhost:9090".to_string(),
                timeout,
            },
            jaeger: JaegerConfig {
                url: "http://localhost:16686".to_string(),
                timeout,
                lookback: "15m".to_string(),
                limit: 20,
            },
            neo4j: Neo4jConfig {
                uri: "bolt://localhost:7687".to_string(),
                user: "neo4j".to_string(),
                password: "neo4j".to_string(),
            },
        }
    }
}

fn parse_positive<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => Err(Error::Config(format!("{} must be a positive integer, got '{}'", key, raw))),
    }
}

fn check_url(key: &str, raw: &str, schemes: &[&str]) -> Result<()> {
    let url = Url::parse(raw).map_err(|e| Error::Config(format!("{} is not a valid URL ({}): {}", key, raw, e)))?;
    if !schemes.contains(&url.scheme()) {
        return Err(Error::Config(format!(
            "{} has unsupported scheme '{}', expected one of {}",
            key,
            url.scheme(),
            schemes.join(", ")
        )));
    }
    Ok(())
}
