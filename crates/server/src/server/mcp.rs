//! Model Context Protocol method handling over JSON-RPC.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::jsonrpc::RpcError;
use crate::tools::{ToolOutput, ToolRegistry};
use crate::Error;

pub const PROTOCOL_VERSION: &str = "2025-03-26";
pub const SERVER_NAME: &str = "cluster-insight";

const INSTRUCTIONS: &str = "Tools for investigating incidents in a Kubernetes namespace: pod and \
service health, logs, container metrics, distributed traces and the service dependency graph. \
Start with get_cluster_overview or get_problematic_pods.";

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Answer one request method.
pub async fn dispatch(registry: &ToolRegistry, method: &str, params: Option<Value>) -> Result<Value, RpcError> {
    match method {
        "initialize" => Ok(initialize_result()),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(list_tools(registry)),
        "tools/call" => call_tool(registry, params).await,
        other => {
            debug!("Unsupported method {}", other);
            Err(RpcError::method_not_found(other))
        }
    }
}

pub fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": { "listChanged": false }
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "instructions": INSTRUCTIONS,
    })
}

pub fn list_tools(registry: &ToolRegistry) -> Value {
    let tools: Vec<Value> = registry
        .tools()
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name(),
                "title": tool.title(),
                "description": tool.description(),
                "inputSchema": tool.input_schema(),
            })
        })
        .collect();
    json!({ "tools": tools })
}

async fn call_tool(registry: &ToolRegistry, params: Option<Value>) -> Result<Value, RpcError> {
    let params: CallParams = serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| RpcError::invalid_params(format!("Invalid tools/call params: {}", e)))?;

    match registry.call(&params.name, params.arguments).await {
        Ok(output) => Ok(tool_result(&output)),
        Err(Error::NotFound(message)) => Err(RpcError::invalid_params(message)),
        Err(e) => {
            warn!("Tool {} failed: {}", params.name, e);
            Ok(json!({
                "content": [{ "type": "text", "text": e.to_string() }],
                "isError": true,
            }))
        }
    }
}

/// A successful `tools/call` result.
pub fn tool_result(output: &ToolOutput) -> Value {
    let mut result = json!({
        "content": [{ "type": "text", "text": output.to_text() }],
        "isError": false,
    });
    if let Some(structured) = output.structured() {
        result["structuredContent"] = structured.clone();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_output_is_also_structured() {
        let result = tool_result(&ToolOutput::Json(json!({"status": "Cache refreshed"})));
        assert_eq!(result["isError"], false);
        assert_eq!(result["structuredContent"]["status"], "Cache refreshed");
        assert_eq!(result["content"][0]["type"], "text");
    }

    #[test]
    fn text_output_is_not_structured() {
        let result = tool_result(&ToolOutput::Text("No important log entries found".to_string()));
        assert!(result.get("structuredContent").is_none());
        assert_eq!(result["content"][0]["text"], "No important log entries found");
    }

    #[test]
    fn initialize_advertises_tools() {
        let result = initialize_result();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert!(result["capabilities"]["tools"].is_object());
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
    }
}
