//! Prometheus metrics for pods and services, plus instant-metric triage.

mod catalog;
mod client;
mod inspector;
mod triage;

pub use catalog::{pod_query, CONTAINER_METRICS};
pub use client::{parse_sample_value, PrometheusClient};
pub use inspector::{MetricsInspector, PodMetrics, Reading, ServiceMetrics, ServiceMetricsOutcome, DEFAULT_STEP};
pub use triage::{triage, TriageResult};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::Result;

/// One sample of an instant vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub metric: BTreeMap<String, String>,
    pub value: f64,
}

/// One series of a range matrix, as `(timestamp, value)` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub metric: BTreeMap<String, String>,
    pub values: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub step: String,
}

impl RangeWindow {
    /// A window ending now and reaching `minutes` back.
    pub fn last_minutes(minutes: u32, step: impl Into<String>) -> Self {
        let end = Utc::now();
        Self {
            start: end - chrono::Duration::minutes(i64::from(minutes)),
            end,
            step: step.into(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn instant(&self, query: &str) -> Result<Vec<Sample>>;

    async fn range(&self, query: &str, window: RangeWindow) -> Result<Vec<Series>>;
}
