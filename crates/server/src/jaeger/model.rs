//! Jaeger query API trace documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trace {
    #[serde(rename = "traceID")]
    pub trace_id: String,
    #[serde(default)]
    pub spans: Vec<Span>,
    #[serde(default)]
    pub processes: BTreeMap<String, Process>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Span {
    #[serde(rename = "spanID", default)]
    pub span_id: String,
    #[serde(rename = "operationName", default)]
    pub operation_name: String,
    #[serde(default)]
    pub references: Vec<Reference>,
    /// Microseconds since the epoch
    #[serde(rename = "startTime", default)]
    pub start_time: u64,
    /// Microseconds
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub tags: Vec<KeyValue>,
    #[serde(default)]
    pub logs: Vec<Log>,
    #[serde(rename = "processID", default)]
    pub process_id: String,
}

impl Span {
    pub fn is_root(&self) -> bool {
        self.references.is_empty()
    }

    /// Spans are marked failed by a boolean `error=true` tag.
    pub fn is_error(&self) -> bool {
        self.tags
            .iter()
            .any(|tag| tag.key == "error" && tag.value == Value::Bool(true))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reference {
    #[serde(rename = "refType")]
    pub ref_type: String,
    #[serde(rename = "traceID")]
    pub trace_id: String,
    #[serde(rename = "spanID")]
    pub span_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyValue {
    pub key: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Log {
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub fields: Vec<KeyValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Process {
    #[serde(rename = "serviceName")]
    pub service_name: String,
    #[serde(default)]
    pub tags: Vec<KeyValue>,
}

/// Envelope of every Jaeger query API response.
#[derive(Debug, Deserialize)]
pub struct JaegerResponse<T> {
    pub data: Option<Vec<T>>,
    pub errors: Option<Vec<JaegerError>>,
}

#[derive(Debug, Deserialize)]
pub struct JaegerError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub msg: String,
}
