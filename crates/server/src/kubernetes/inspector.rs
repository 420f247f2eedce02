use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

use super::{filter_important_lines, label_selector, KubeBackend, ProblematicPodsReport};
use crate::cache::NameCache;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PodStatusEntry {
    pub pod_name: String,
    pub pod_status: Option<String>,
}

/// Pods selected by a service, or the reason they could not be resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServicePods {
    pub service_name: String,
    pub namespace: String,
    pub pods: Vec<PodStatusEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Namespace-scoped view of the cluster with cached pod and service names.
pub struct ClusterInspector {
    backend: Arc<dyn KubeBackend>,
    namespace: String,
    pods: NameCache,
    services: NameCache,
    all_services: NameCache,
}

impl ClusterInspector {
    pub fn new(backend: Arc<dyn KubeBackend>, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
            pods: NameCache::new("pods"),
            services: NameCache::new("services"),
            all_services: NameCache::new("cluster-wide services"),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub async fn pods(&self) -> Vec<String> {
        self.pods
            .get_or_load(|| self.backend.pod_names(&self.namespace))
            .await
    }

    pub async fn services(&self) -> Vec<String> {
        self.services
            .get_or_load(|| self.backend.service_names(&self.namespace))
            .await
    }

    pub async fn services_in_all_namespaces(&self) -> Vec<String> {
        self.all_services
            .get_or_load(|| self.backend.all_service_names())
            .await
    }

    pub async fn has_pod(&self, pod: &str) -> bool {
        self.pods().await.iter().any(|p| p == pod)
    }

    pub async fn has_service(&self, service: &str) -> bool {
        self.services().await.iter().any(|s| s == service)
    }

    pub async fn refresh_cache(&self) {
        self.pods.clear().await;
        self.services.clear().await;
        self.all_services.clear().await;
    }

    /// The error text used whenever a pod is missing from the namespace.
    pub fn missing_pod_message(&self, pod: &str) -> String {
        format!("The pod {} does not exist in the {} namespace.", pod, self.namespace)
    }

    pub async fn pods_from_service(&self, service: &str) -> ServicePods {
        let mut result = ServicePods {
            service_name: service.to_string(),
            namespace: self.namespace.clone(),
            pods: Vec::new(),
            error: None,
        };

        if !self.has_service(service).await {
            result.error = Some(format!(
                "The service {} does not exist in the {} namespace.",
                service, self.namespace
            ));
            return result;
        }

        let selector = match self.backend.service_selector(&self.namespace, service).await {
            Ok(Some(selector)) if !selector.is_empty() => selector,
            Ok(_) => {
                result.error = Some(format!("Service {} has no selector configured.", service));
                return result;
            }
            Err(e) => {
                result.error = Some(format!("Failed to get pods for service {}: {}", service, e));
                return result;
            }
        };

        let selector = label_selector(&selector);
        debug!("Resolving pods of service {} with selector {}", service, selector);

        match self.backend.list_pods(&self.namespace, Some(selector)).await {
            Ok(pods) => {
                result.pods = pods
                    .into_iter()
                    .map(|pod| PodStatusEntry {
                        pod_name: pod.metadata.name.unwrap_or_default(),
                        pod_status: pod.status.and_then(|s| s.phase),
                    })
                    .collect();
            }
            Err(e) => {
                result.error = Some(format!("Failed to get pods for service {}: {}", service, e));
            }
        }

        result
    }

    pub async fn pod_logs(&self, pod: &str, tail: i64, important: bool) -> String {
        if !self.has_pod(pod).await {
            return self.missing_pod_message(pod);
        }

        let logs = match self.backend.pod_logs(&self.namespace, pod, tail).await {
            Ok(logs) => logs,
            Err(e) => return format!("Failed to get logs for pod {}: {}", pod, e),
        };

        if important {
            filter_important_lines(&logs)
        } else {
            logs
        }
    }

    pub async fn service_logs(&self, service: &str, tail: i64, important: bool) -> String {
        let resolved = self.pods_from_service(service).await;
        if let Some(err) = resolved.error {
            return format!("Error getting pods for service '{}': {}", service, err);
        }

        let mut output = format!("=== Logs for service '{}' ===\n\n", service);
        for pod in &resolved.pods {
            let logs = self.pod_logs(&pod.pod_name, tail, important).await;
            output.push_str(&format!("--- Pod: {} ---\n", pod.pod_name));
            output.push_str(&logs);
            output.push_str("\n\n");
        }
        output
    }

    pub async fn problematic_pods(&self) -> ProblematicPodsReport {
        match self.backend.list_pods(&self.namespace, None).await {
            Ok(pods) => ProblematicPodsReport::from_pods(&pods),
            Err(e) => {
                error!("Could not list pods in namespace '{}': {}", self.namespace, e);
                ProblematicPodsReport::failed(format!(
                    "Could not list pods in namespace '{}': {}",
                    self.namespace, e
                ))
            }
        }
    }
}
