use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::{
    api::{Api, ListParams, LogParams},
    Client,
};
use std::collections::BTreeMap;
use tracing::debug;

use super::KubeBackend;
use crate::Result;

/// `KubeBackend` over a live `kube::Client`.
#[derive(Clone)]
pub struct KubeClient {
    client: Client,
}

impl KubeClient {
    /// Connect using the in-cluster service account or the local kubeconfig.
    pub async fn new() -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn names<K>(items: &[K]) -> Vec<String>
where
    K: kube::Resource,
{
    items
        .iter()
        .filter_map(|item| item.meta().name.clone())
        .collect()
}

#[async_trait]
impl KubeBackend for KubeClient {
    async fn pod_names(&self, namespace: &str) -> Result<Vec<String>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods.list(&ListParams::default()).await?;
        Ok(names(&list.items))
    }

    async fn service_names(&self, namespace: &str) -> Result<Vec<String>> {
        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let list = services.list(&ListParams::default()).await?;
        Ok(names(&list.items))
    }

    async fn all_service_names(&self) -> Result<Vec<String>> {
        let services: Api<Service> = Api::all(self.client.clone());
        let list = services.list(&ListParams::default()).await?;
        Ok(names(&list.items))
    }

    async fn service_selector(
        &self,
        namespace: &str,
        service: &str,
    ) -> Result<Option<BTreeMap<String, String>>> {
        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let svc = services.get(service).await?;
        Ok(svc.spec.and_then(|spec| spec.selector))
    }

    async fn list_pods(&self, namespace: &str, label_selector: Option<String>) -> Result<Vec<Pod>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let mut params = ListParams::default();
        if let Some(selector) = label_selector.as_deref() {
            debug!("Listing pods in {} with selector {}", namespace, selector);
            params = params.labels(selector);
        }
        Ok(pods.list(&params).await?.items)
    }

    async fn pod_logs(&self, namespace: &str, pod: &str, tail_lines: i64) -> Result<String> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams {
            tail_lines: Some(tail_lines),
            ..Default::default()
        };
        Ok(pods.logs(pod, &params).await?)
    }
}
