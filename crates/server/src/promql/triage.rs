//! First-pass health check over instant metrics.
//!
//! Only signals that are meaningful without knowing the pod's resource limits
//! are considered: thread saturation, CPU load average, and lifetime network
//! error counters.

use serde::Serialize;
use std::collections::BTreeMap;

use super::{PodMetrics, Reading};

const THREAD_SATURATION_RATIO: f64 = 0.95;
const CPU_LOAD_LIMIT: f64 = 10.0;
const NETWORK_EVENT_LIMIT: f64 = 1.0;

const NETWORK_CHECKS: &[(&str, &str)] = &[
    ("container_network_receive_errors_total", "receive errors"),
    ("container_network_transmit_errors_total", "transmit errors"),
    ("container_network_receive_packets_dropped_total", "dropped received packets"),
    ("container_network_transmit_packets_dropped_total", "dropped transmitted packets"),
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TriageResult {
    pub is_anomalous: bool,
    pub reasons: Vec<String>,
    pub checked_metrics: BTreeMap<String, Reading<f64>>,
}

pub fn triage(pod: &PodMetrics<f64>) -> TriageResult {
    let mut result = TriageResult {
        is_anomalous: false,
        reasons: Vec::new(),
        checked_metrics: pod.metrics.clone(),
    };

    if let Some(error) = &pod.error {
        result.is_anomalous = true;
        result.reasons.push(error.clone());
        return result;
    }

    let value = |metric: &str| pod.reading(metric).and_then(Reading::value);

    if let (Some(threads), Some(threads_max)) = (value("container_threads"), value("container_threads_max")) {
        if threads_max > 0.0 {
            let ratio = threads / threads_max;
            if ratio > THREAD_SATURATION_RATIO {
                result.reasons.push(format!(
                    "CRITICAL: Thread usage is at {:.2}% of the maximum ({}/{}). Application may hang or crash.",
                    ratio * 100.0,
                    threads as i64,
                    threads_max as i64
                ));
            }
        }
    }

    if let Some(load) = value("container_cpu_load_average_10s") {
        if load > CPU_LOAD_LIMIT {
            result.reasons.push(format!(
                "WARNING: High CPU load average of {:.2}. The CPU is likely saturated, causing high latency.",
                load
            ));
        }
    }

    for (metric, description) in NETWORK_CHECKS {
        if let Some(count) = value(*metric).filter(|c| *c > NETWORK_EVENT_LIMIT) {
            result.reasons.push(format!(
                "INFO: Pod has a history of {} network {}.",
                count as i64, description
            ));
        }
    }

    result.is_anomalous = !result.reasons.is_empty();
    result
}
