//! Compact per-trace summaries: latency, error text and service sequence.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::model::{Span, Trace};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceSummary {
    #[serde(rename = "traceID")]
    pub trace_id: String,
    pub latency_ms: f64,
    pub has_error: bool,
    /// Services in call order, e.g. `frontend -> cart -> redis`
    pub sequence: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Summarize a trace, or `None` when it has no root span.
pub fn summarize_trace(trace: &Trace) -> Option<TraceSummary> {
    let root = trace.spans.iter().find(|s| s.is_root())?;
    let latency_ms = root.duration as f64 / 1000.0;

    let error_spans: Vec<&Span> = trace.spans.iter().filter(|s| s.is_error()).collect();
    let has_error = !error_spans.is_empty();

    let error_message = has_error.then(|| {
        let details: Vec<String> = error_spans.iter().flat_map(|s| error_details(s)).collect();
        if details.is_empty() {
            "N/A".to_string()
        } else {
            details.join("; ")
        }
    });

    Some(TraceSummary {
        trace_id: trace.trace_id.clone(),
        latency_ms,
        has_error,
        sequence: service_sequence(trace).join(" -> "),
        error_message,
    })
}

/// Messages and first stack lines from a span's `event=error` logs.
fn error_details(span: &Span) -> Vec<String> {
    let mut details = Vec::new();
    for log in &span.logs {
        let fields: HashMap<&str, &Value> = log
            .fields
            .iter()
            .map(|f| (f.key.as_str(), &f.value))
            .collect();

        if fields.get("event").and_then(|v| v.as_str()) != Some("error") {
            continue;
        }
        if let Some(message) = fields.get("message") {
            details.push(value_text(message));
        }
        if let Some(stack) = fields.get("stack") {
            let stack = value_text(stack);
            details.push(stack.split('\n').next().unwrap_or_default().to_string());
        }
    }
    details
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Service names ordered by span start time, with consecutive repeats
/// collapsed. Spans whose process is unknown are skipped.
pub fn service_sequence(trace: &Trace) -> Vec<String> {
    let mut spans: Vec<&Span> = trace.spans.iter().collect();
    spans.sort_by_key(|s| s.start_time);

    let mut sequence: Vec<String> = Vec::new();
    for span in spans {
        let Some(process) = trace.processes.get(&span.process_id) else {
            continue;
        };
        let service = &process.service_name;
        if service.is_empty() || sequence.last() == Some(service) {
            continue;
        }
        sequence.push(service.clone());
    }
    sequence
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jaeger::model::{KeyValue, Log, Process, Reference};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn span(id: &str, process: &str, start: u64, duration: u64, parent: Option<&str>) -> Span {
        Span {
            span_id: id.to_string(),
            operation_name: format!("op-{}", id),
            references: parent
                .map(|p| {
                    vec![Reference {
                        ref_type: "CHILD_OF".to_string(),
                        trace_id: "t1".to_string(),
                        span_id: p.to_string(),
                    }]
                })
                .unwrap_or_default(),
            start_time: start,
            duration,
            process_id: process.to_string(),
            ..Default::default()
        }
    }

    fn kv(key: &str, value: Value) -> KeyValue {
        KeyValue {
            key: key.to_string(),
            value_type: None,
            value,
        }
    }

    fn trace(spans: Vec<Span>) -> Trace {
        let mut processes = BTreeMap::new();
        for (id, name) in [("p1", "frontend"), ("p2", "cart"), ("p3", "redis")] {
            processes.insert(
                id.to_string(),
                Process {
                    service_name: name.to_string(),
                    tags: vec![],
                },
            );
        }
        Trace {
            trace_id: "t1".to_string(),
            spans,
            processes,
        }
    }

    #[test]
    fn healthy_trace_summary() {
        // Spans arrive out of order; the sequence follows start time
        let t = trace(vec![
            span("c", "p3", 300, 50, Some("b")),
            span("a", "p1", 100, 12_345, None),
            span("b", "p2", 200, 400, Some("a")),
            span("b2", "p2", 250, 10, Some("b")),
        ]);
        let summary = summarize_trace(&t).unwrap();
        assert_eq!(summary.trace_id, "t1");
        assert_eq!(summary.latency_ms, 12.345);
        assert!(!summary.has_error);
        assert_eq!(summary.sequence, "frontend -> cart -> redis");
        assert_eq!(summary.error_message, None);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["traceID"], "t1");
        assert!(json.get("error_message").is_none());
    }

    #[test]
    fn error_messages_are_collected() {
        let mut failing = span("b", "p2", 200, 400, Some("a"));
        failing.tags = vec![kv("error", json!(true))];
        failing.logs = vec![
            Log {
                timestamp: 210,
                fields: vec![
                    kv("event", json!("error")),
                    kv("message", json!("redis timeout")),
                    kv("stack", json!("TimeoutError: 2s\n  at get (cart.js:10)")),
                ],
            },
            Log {
                timestamp: 220,
                fields: vec![kv("event", json!("retry")), kv("message", json!("ignored"))],
            },
        ];

        let t = trace(vec![span("a", "p1", 100, 1_000, None), failing]);
        let summary = summarize_trace(&t).unwrap();
        assert!(summary.has_error);
        assert_eq!(
            summary.error_message.as_deref(),
            Some("redis timeout; TimeoutError: 2s")
        );
    }

    #[test]
    fn error_without_logs_reads_na() {
        let mut root = span("a", "p1", 100, 1_000, None);
        root.tags = vec![kv("error", json!(true))];
        let summary = summarize_trace(&trace(vec![root])).unwrap();
        assert_eq!(summary.error_message.as_deref(), Some("N/A"));
    }

    #[test]
    fn trace_without_root_is_skipped() {
        let t = trace(vec![span("b", "p2", 200, 400, Some("a"))]);
        assert!(summarize_trace(&t).is_none());
    }

    #[test]
    fn repeated_services_collapse_only_when_adjacent() {
        let t = trace(vec![
            span("a", "p1", 1, 100, None),
            span("b", "p2", 2, 10, Some("a")),
            span("c", "p1", 3, 10, Some("a")),
            span("d", "p9", 4, 10, Some("a")),
            span("e", "p1", 5, 10, Some("a")),
        ]);
        assert_eq!(service_sequence(&t), vec!["frontend", "cart", "frontend"]);
    }
}
