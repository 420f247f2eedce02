use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{pod_query, triage, MetricsSource, RangeWindow, TriageResult, CONTAINER_METRICS};
use crate::kubernetes::{ClusterInspector, ServicePods};

/// Resolution used for range queries.
pub const DEFAULT_STEP: &str = "1m";

/// The value reported for one metric: a reading, nothing (null), or the
/// query error as text.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Reading<T> {
    Value(T),
    Missing,
    Failed(String),
}

impl Reading<f64> {
    pub fn value(&self) -> Option<f64> {
        match self {
            Reading::Value(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PodMetrics<T> {
    pub resource_type: String,
    pub resource_namespace: String,
    pub resource_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    pub metrics: BTreeMap<String, Reading<T>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> PodMetrics<T> {
    fn empty(namespace: &str, pod: &str) -> Self {
        Self {
            resource_type: "pod".to_string(),
            resource_namespace: namespace.to_string(),
            resource_name: pod.to_string(),
            time_range_minutes: None,
            step: None,
            metrics: BTreeMap::new(),
            error: None,
        }
    }

    pub fn reading(&self, metric: &str) -> Option<&Reading<T>> {
        self.metrics.get(metric)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceMetrics<T> {
    pub service_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range_minutes: Option<u32>,
    pub pods: Vec<PodMetrics<T>>,
}

/// Metrics for every pod of a service, or the pod lookup that failed.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ServiceMetricsOutcome<T> {
    Metrics(ServiceMetrics<T>),
    Unresolved(ServicePods),
}

pub struct MetricsInspector {
    source: Arc<dyn MetricsSource>,
    cluster: Arc<ClusterInspector>,
}

impl MetricsInspector {
    pub fn new(source: Arc<dyn MetricsSource>, cluster: Arc<ClusterInspector>) -> Self {
        Self { source, cluster }
    }

    /// Instant values of every catalogue metric for one pod.
    pub async fn pod_metrics(&self, pod: &str) -> PodMetrics<f64> {
        let namespace = self.cluster.namespace();
        let mut result = PodMetrics::empty(namespace, pod);

        if !self.cluster.has_pod(pod).await {
            result.error = Some(self.cluster.missing_pod_message(pod));
            return result;
        }

        let queries = CONTAINER_METRICS.iter().map(|metric| async move {
            let query = pod_query(metric, namespace, pod);
            let reading = match self.source.instant(&query).await {
                Ok(samples) => samples
                    .first()
                    .map(|s| Reading::Value(s.value))
                    .unwrap_or(Reading::Missing),
                Err(e) => {
                    warn!("Query for {} on pod {} failed: {}", metric, pod, e);
                    Reading::Failed(format!("Error: {}", e))
                }
            };
            (metric.to_string(), reading)
        });

        result.metrics = join_all(queries).await.into_iter().collect();
        debug!("Collected {} metrics for pod {}", result.metrics.len(), pod);
        result
    }

    /// Value history of every catalogue metric for one pod over the last
    /// `minutes` minutes.
    pub async fn pod_metrics_range(&self, pod: &str, minutes: u32, step: &str) -> PodMetrics<Vec<f64>> {
        let namespace = self.cluster.namespace();
        let mut result = PodMetrics::empty(namespace, pod);
        result.time_range_minutes = Some(minutes);
        result.step = Some(step.to_string());

        if !self.cluster.has_pod(pod).await {
            result.error = Some(self.cluster.missing_pod_message(pod));
            return result;
        }

        let window = RangeWindow::last_minutes(minutes, step);
        let queries = CONTAINER_METRICS.iter().map(|metric| {
            let window = window.clone();
            async move {
                let query = pod_query(metric, namespace, pod);
                let reading = match self.source.range(&query, window).await {
                    Ok(series) => series
                        .first()
                        .map(|s| Reading::Value(s.values.iter().map(|(_, v)| *v).collect()))
                        .unwrap_or(Reading::Missing),
                    Err(e) => {
                        warn!("Range query for {} on pod {} failed: {}", metric, pod, e);
                        Reading::Failed(format!("Error: {}", e))
                    }
                };
                (metric.to_string(), reading)
            }
        });

        result.metrics = join_all(queries).await.into_iter().collect();
        result
    }

    pub async fn service_metrics(&self, service: &str) -> ServiceMetricsOutcome<f64> {
        let resolved = self.cluster.pods_from_service(service).await;
        if resolved.error.is_some() {
            return ServiceMetricsOutcome::Unresolved(resolved);
        }

        let mut pods = Vec::with_capacity(resolved.pods.len());
        for pod in &resolved.pods {
            pods.push(self.pod_metrics(&pod.pod_name).await);
        }

        ServiceMetricsOutcome::Metrics(ServiceMetrics {
            service_name: service.to_string(),
            time_range_minutes: None,
            pods,
        })
    }

    pub async fn service_metrics_range(&self, service: &str, minutes: u32) -> ServiceMetricsOutcome<Vec<f64>> {
        let resolved = self.cluster.pods_from_service(service).await;
        if resolved.error.is_some() {
            return ServiceMetricsOutcome::Unresolved(resolved);
        }

        let mut pods = Vec::with_capacity(resolved.pods.len());
        for pod in &resolved.pods {
            pods.push(self.pod_metrics_range(&pod.pod_name, minutes, DEFAULT_STEP).await);
        }

        ServiceMetricsOutcome::Metrics(ServiceMetrics {
            service_name: service.to_string(),
            time_range_minutes: Some(minutes),
            pods,
        })
    }

    pub async fn pod_triage(&self, pod: &str) -> TriageResult {
        let metrics = self.pod_metrics(pod).await;
        triage(&metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes::MockKubeBackend;
    use crate::promql::{MockMetricsSource, Sample, Series};
    use crate::Error;
    use std::collections::BTreeMap;

    fn cluster() -> Arc<ClusterInspector> {
        let mut backend = MockKubeBackend::new();
        backend
            .expect_pod_names()
            .returning(|_| Ok(vec!["cart-7d9f".to_string()]));
        backend
            .expect_service_names()
            .returning(|_| Ok(vec!["cart".to_string()]));
        Arc::new(ClusterInspector::new(Arc::new(backend), "shop"))
    }

    fn sample(value: f64) -> Sample {
        Sample {
            metric: BTreeMap::new(),
            value,
        }
    }

    #[tokio::test]
    async fn instant_metrics_cover_catalog() {
        let mut source = MockMetricsSource::new();
        source.expect_instant().returning(|query| {
            if query.starts_with("container_threads{") {
                Ok(vec![sample(12.0), sample(99.0)])
            } else if query.starts_with("container_memory_rss{") {
                Err(Error::Prometheus("timeout".to_string()))
            } else {
                Ok(vec![])
            }
        });

        let inspector = MetricsInspector::new(Arc::new(source), cluster());
        let metrics = inspector.pod_metrics("cart-7d9f").await;

        assert_eq!(metrics.error, None);
        assert_eq!(metrics.metrics.len(), CONTAINER_METRICS.len());
        assert_eq!(metrics.reading("container_threads"), Some(&Reading::Value(12.0)));
        assert_eq!(metrics.reading("container_threads_max"), Some(&Reading::Missing));
        assert_eq!(
            metrics.reading("container_memory_rss"),
            Some(&Reading::Failed("Error: Prometheus error: timeout".to_string()))
        );

        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["resource_type"], "pod");
        assert_eq!(json["resource_namespace"], "shop");
        assert!(json["metrics"]["container_threads_max"].is_null());
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn unknown_pod_is_reported_without_querying() {
        let mut source = MockMetricsSource::new();
        source.expect_instant().never();

        let inspector = MetricsInspector::new(Arc::new(source), cluster());
        let metrics = inspector.pod_metrics("ghost").await;
        assert_eq!(
            metrics.error.as_deref(),
            Some("The pod ghost does not exist in the shop namespace.")
        );
        assert!(metrics.metrics.is_empty());
    }

    #[tokio::test]
    async fn range_metrics_keep_values_only() {
        let mut source = MockMetricsSource::new();
        source.expect_range().returning(|_, window| {
            assert_eq!(window.step, "1m");
            assert_eq!((window.end - window.start).num_minutes(), 5);
            Ok(vec![Series {
                metric: BTreeMap::new(),
                values: vec![(1.0, 10.0), (61.0, 11.5)],
            }])
        });

        let inspector = MetricsInspector::new(Arc::new(source), cluster());
        let metrics = inspector.pod_metrics_range("cart-7d9f", 5, DEFAULT_STEP).await;

        assert_eq!(metrics.time_range_minutes, Some(5));
        assert_eq!(
            metrics.reading("container_cpu_usage_seconds_total"),
            Some(&Reading::Value(vec![10.0, 11.5]))
        );
    }

    #[tokio::test]
    async fn service_lookup_errors_pass_through() {
        let source = MockMetricsSource::new();
        let inspector = MetricsInspector::new(Arc::new(source), cluster());

        match inspector.service_metrics("payments").await {
            ServiceMetricsOutcome::Unresolved(pods) => {
                assert_eq!(
                    pods.error.as_deref(),
                    Some("The service payments does not exist in the shop namespace.")
                );
            }
            other => panic!("expected unresolved service, got {:?}", other),
        }
    }
}
