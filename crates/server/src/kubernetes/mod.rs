//! Kubernetes access: pods, services, selectors and logs.

mod client;
mod health;
mod inspector;
mod logs;

pub use client::KubeClient;
pub use health::{inspect_pod, ContainerIssue, IssueType, ProblematicPod, ProblematicPodsReport};
pub use inspector::{ClusterInspector, PodStatusEntry, ServicePods};
pub use logs::{filter_important_lines, IMPORTANT_KEYWORDS};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use std::collections::BTreeMap;

use crate::Result;

/// The subset of the Kubernetes API the inspectors need.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KubeBackend: Send + Sync {
    async fn pod_names(&self, namespace: &str) -> Result<Vec<String>>;

    async fn service_names(&self, namespace: &str) -> Result<Vec<String>>;

    /// Service names across every namespace the credentials can see.
    async fn all_service_names(&self) -> Result<Vec<String>>;

    async fn service_selector(
        &self,
        namespace: &str,
        service: &str,
    ) -> Result<Option<BTreeMap<String, String>>>;

    async fn list_pods(&self, namespace: &str, label_selector: Option<String>) -> Result<Vec<Pod>>;

    async fn pod_logs(&self, namespace: &str, pod: &str, tail_lines: i64) -> Result<String>;
}

/// Render a selector map as a `k=v,k=v` label selector.
pub fn label_selector(selector: &BTreeMap<String, String>) -> String {
    selector
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_is_sorted_and_comma_joined() {
        let mut selector = BTreeMap::new();
        selector.insert("tier".to_string(), "backend".to_string());
        selector.insert("app".to_string(), "cart".to_string());
        assert_eq!(label_selector(&selector), "app=cart,tier=backend");
        assert_eq!(label_selector(&BTreeMap::new()), "");
    }
}
