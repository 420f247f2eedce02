//! Status-based detection of unhealthy pods.

use k8s_openapi::api::core::v1::{ContainerStatus, Pod};
use serde::{Deserialize, Serialize};

/// Restart counts above this are treated as a crash loop.
const RESTART_THRESHOLD: i32 = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IssueType {
    #[serde(rename = "Pod Pending")]
    PodPending,
    #[serde(rename = "Waiting")]
    Waiting,
    #[serde(rename = "Terminated With Error")]
    TerminatedWithError,
    #[serde(rename = "High Restarts")]
    HighRestarts,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerIssue {
    pub container_name: String,
    pub issue_type: IssueType,
    pub reason: Option<String>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart_count: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProblematicPod {
    pub pod_name: String,
    pub namespace: Option<String>,
    pub pod_phase: Option<String>,
    pub container_issues: Vec<ContainerIssue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProblematicPodsReport {
    pub problematic_pods: Vec<ProblematicPod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProblematicPodsReport {
    pub fn from_pods(pods: &[Pod]) -> Self {
        let problematic_pods: Vec<ProblematicPod> = pods.iter().filter_map(inspect_pod).collect();
        let info = problematic_pods.is_empty().then(|| {
            "No problematic pods detected based on status analysis. All pods appear healthy.".to_string()
        });
        Self {
            problematic_pods,
            info,
            error: None,
        }
    }

    pub fn failed(message: String) -> Self {
        Self {
            error: Some(message),
            ..Default::default()
        }
    }
}

/// Return the pod with its container issues, or `None` if it looks healthy.
pub fn inspect_pod(pod: &Pod) -> Option<ProblematicPod> {
    let status = pod.status.as_ref();
    let phase = status.and_then(|s| s.phase.clone());
    let statuses = status
        .and_then(|s| s.container_statuses.as_deref())
        .unwrap_or_default();

    let issues: Vec<ContainerIssue> = if statuses.is_empty() {
        // No container statuses yet: only a stuck Pending pod is worth reporting
        if phase.as_deref() == Some("Pending") {
            vec![ContainerIssue {
                container_name: "N/A".to_string(),
                issue_type: IssueType::PodPending,
                reason: Some(
                    status
                        .and_then(|s| s.reason.clone())
                        .unwrap_or_else(|| "Unknown".to_string()),
                ),
                message: Some(
                    status
                        .and_then(|s| s.message.clone())
                        .unwrap_or_else(|| "Waiting for scheduling or resources.".to_string()),
                ),
                exit_code: None,
                restart_count: None,
            }]
        } else {
            Vec::new()
        }
    } else {
        statuses.iter().filter_map(inspect_container).collect()
    };

    if issues.is_empty() {
        return None;
    }

    Some(ProblematicPod {
        pod_name: pod.metadata.name.clone().unwrap_or_default(),
        namespace: pod.metadata.namespace.clone(),
        pod_phase: phase,
        container_issues: issues,
    })
}

fn inspect_container(container: &ContainerStatus) -> Option<ContainerIssue> {
    let state = container.state.as_ref();

    if let Some(waiting) = state.and_then(|s| s.waiting.as_ref()) {
        return Some(ContainerIssue {
            container_name: container.name.clone(),
            issue_type: IssueType::Waiting,
            reason: waiting.reason.clone(),
            message: waiting.message.clone(),
            exit_code: None,
            restart_count: Some(container.restart_count),
        });
    }

    if let Some(terminated) = state
        .and_then(|s| s.terminated.as_ref())
        .filter(|t| t.exit_code != 0)
    {
        return Some(ContainerIssue {
            container_name: container.name.clone(),
            issue_type: IssueType::TerminatedWithError,
            reason: terminated.reason.clone(),
            message: terminated.message.clone(),
            exit_code: Some(terminated.exit_code),
            restart_count: Some(container.restart_count),
        });
    }

    if container.restart_count > RESTART_THRESHOLD {
        // A crash-looping container is often Running between crashes, so the
        // last termination carries the useful reason
        let reason = container
            .last_state
            .as_ref()
            .and_then(|s| s.terminated.as_ref())
            .and_then(|t| t.reason.clone())
            .unwrap_or_else(|| "High Restart Count".to_string());
        return Some(ContainerIssue {
            container_name: container.name.clone(),
            issue_type: IssueType::HighRestarts,
            reason: Some(reason),
            message: Some(
                "Container is restarting frequently, indicating a potential crash loop.".to_string(),
            ),
            exit_code: None,
            restart_count: Some(container.restart_count),
        });
    }

    None
}
