/// cAdvisor container metrics reported for every pod, in name order.
pub const CONTAINER_METRICS: &[&str] = &[
    "container_cpu_cfs_periods_total",
    "container_cpu_cfs_throttled_periods_total",
    "container_cpu_cfs_throttled_seconds_total",
    "container_cpu_load_average_10s",
    "container_cpu_system_seconds_total",
    "container_cpu_usage_seconds_total",
    "container_cpu_user_seconds_total",
    "container_memory_cache",
    "container_memory_mapped_file",
    "container_memory_rss",
    "container_memory_usage_bytes",
    "container_memory_working_set_bytes",
    "container_network_receive_bytes_total",
    "container_network_receive_errors_total",
    "container_network_receive_packets_dropped_total",
    "container_network_receive_packets_total",
    "container_network_transmit_bytes_total",
    "container_network_transmit_errors_total",
    "container_network_transmit_packets_dropped_total",
    "container_network_transmit_packets_total",
    "container_spec_cpu_period",
    "container_spec_cpu_quota",
    "container_spec_cpu_shares",
    "container_spec_memory_limit_bytes",
    "container_threads",
    "container_threads_max",
];

/// Selector for one metric of a pod. The pod name is matched as a substring
/// so per-container series are picked up too.
pub fn pod_query(metric: &str, namespace: &str, pod: &str) -> String {
    format!(r#"{}{{namespace="{}", pod=~".*{}.*"}}"#, metric, namespace, pod)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn catalog_is_sorted_and_unique() {
        let unique: BTreeSet<_> = CONTAINER_METRICS.iter().collect();
        assert_eq!(unique.len(), CONTAINER_METRICS.len());
        assert_eq!(CONTAINER_METRICS.len(), 26);
        assert!(unique.iter().copied().eq(CONTAINER_METRICS.iter()));
    }

    #[test]
    fn builds_pod_selector() {
        assert_eq!(
            pod_query("container_threads", "shop", "cart-7d9f"),
            r#"container_threads{namespace="shop", pod=~".*cart-7d9f.*"}"#
        );
    }
}
