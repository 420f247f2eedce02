use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use cluster_insight_server::{
    config::Config,
    graph::DependencyGraph,
    jaeger::{
        model::{Process, Span},
        Trace, TraceQuery, TraceSource,
    },
    kubernetes::KubeBackend,
    promql::{MetricsSource, RangeWindow, Sample, Series},
    server::{Server, SESSION_HEADER},
    tools::{Inspectors, ToolRegistry},
    Result,
};
use k8s_openapi::api::core::v1::{Pod, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

struct FakeKube;

fn pod(name: &str, phase: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("shop".to_string()),
            ..Default::default()
        },
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[async_trait]
impl KubeBackend for FakeKube {
    async fn pod_names(&self, _namespace: &str) -> Result<Vec<String>> {
        Ok(vec!["cart-7d9f".to_string(), "frontend-5c4b".to_string()])
    }

    async fn service_names(&self, _namespace: &str) -> Result<Vec<String>> {
        Ok(vec!["cart".to_string(), "frontend".to_string()])
    }

    async fn all_service_names(&self) -> Result<Vec<String>> {
        Ok(vec![
            "cart".to_string(),
            "frontend".to_string(),
            "jaeger-query".to_string(),
        ])
    }

    async fn service_selector(
        &self,
        _namespace: &str,
        service: &str,
    ) -> Result<Option<BTreeMap<String, String>>> {
        let mut selector = BTreeMap::new();
        selector.insert("app".to_string(), service.to_string());
        Ok(Some(selector))
    }

    async fn list_pods(&self, _namespace: &str, label_selector: Option<String>) -> Result<Vec<Pod>> {
        Ok(match label_selector.as_deref() {
            Some("app=cart") => vec![pod("cart-7d9f", "Running")],
            Some(_) => vec![],
            None => vec![pod("cart-7d9f", "Running"), pod("frontend-5c4b", "Pending")],
        })
    }

    async fn pod_logs(&self, _namespace: &str, pod: &str, _tail_lines: i64) -> Result<String> {
        Ok(format!("{} started\n{} ERROR connection refused to redis\n", pod, pod))
    }
}

struct FakePrometheus;

#[async_trait]
impl MetricsSource for FakePrometheus {
    async fn instant(&self, _query: &str) -> Result<Vec<Sample>> {
        Ok(vec![Sample {
            metric: BTreeMap::new(),
            value: 1.0,
        }])
    }

    async fn range(&self, _query: &str, _window: RangeWindow) -> Result<Vec<Series>> {
        Ok(vec![])
    }
}

struct FakeJaeger;

#[async_trait]
impl TraceSource for FakeJaeger {
    async fn find_traces(&self, query: TraceQuery) -> Result<Vec<Trace>> {
        let mut processes = BTreeMap::new();
        processes.insert(
            "p1".to_string(),
            Process {
                service_name: query.service.clone(),
                tags: vec![],
            },
        );
        Ok(vec![Trace {
            trace_id: "4bf92f3577b34da6".to_string(),
            spans: vec![Span {
                span_id: "a1".to_string(),
                operation_name: "GET /".to_string(),
                duration: 42_000,
                process_id: "p1".to_string(),
                ..Default::default()
            }],
            processes,
        }])
    }

    async fn trace(&self, _trace_id: &str) -> Result<Option<Value>> {
        Ok(None)
    }
}

struct FakeGraph;

#[async_trait]
impl DependencyGraph for FakeGraph {
    async fn service_names(&self) -> Result<Vec<String>> {
        Ok(vec!["frontend".to_string(), "cart".to_string()])
    }

    async fn services_called_by(&self, service: &str) -> Result<Vec<String>> {
        Ok(match service {
            "frontend" => vec!["cart".to_string()],
            _ => vec![],
        })
    }

    async fn dependencies_of(&self, service: &str) -> Result<Vec<(String, String)>> {
        Ok(match service {
            "cart" => vec![("redis-cart".to_string(), "Database".to_string())],
            _ => vec![],
        })
    }
}

fn test_server() -> TestServer {
    let mut config = Config::default();
    config.kube.namespace = "shop".to_string();

    let inspectors = Inspectors::new(
        Arc::new(FakeKube),
        Arc::new(FakePrometheus),
        Arc::new(FakeJaeger),
        Arc::new(FakeGraph),
        &config,
    );
    let registry = Arc::new(ToolRegistry::new(&inspectors));
    TestServer::new(Server::new(registry).build_router()).unwrap()
}

async fn rpc(server: &TestServer, id: i64, method: &str, params: Value) -> Value {
    let response = server
        .post("/mcp")
        .json(&json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["id"], id);
    body
}

async fn call_tool(server: &TestServer, name: &str, arguments: Value) -> Value {
    let body = rpc(server, 1, "tools/call", json!({"name": name, "arguments": arguments})).await;
    body["result"].clone()
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = test_server();
    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_initialize_session() {
    let server = test_server();
    let response = server
        .post("/mcp")
        .json(&json!({
            "jsonrpc": "2.0",
            "id": 0,
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": {"name": "test-agent", "version": "0.1.0"}
            }
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let session = response
        .headers()
        .get(SESSION_HEADER)
        .expect("initialize issues a session id")
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(session.len(), 36);

    let body: Value = response.json();
    assert_eq!(body["result"]["protocolVersion"], "2025-03-26");
    assert!(body["result"]["capabilities"]["tools"].is_object());

    let response = server
        .post("/mcp")
        .json(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    assert!(response.text().is_empty());

    let body = rpc(&server, 1, "ping", json!({})).await;
    assert_eq!(body["result"], json!({}));
}

#[tokio::test]
async fn test_tools_list() {
    let server = test_server();
    let body = rpc(&server, 2, "tools/list", json!({})).await;
    let tools = body["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 14);

    let metrics = tools.iter().find(|t| t["name"] == "get_metrics").unwrap();
    assert_eq!(metrics["inputSchema"]["type"], "object");
    assert!(metrics["description"].as_str().unwrap().contains("metrics"));
    assert!(tools.iter().any(|t| t["name"] == "refresh_cache"));
}

#[tokio::test]
async fn test_cluster_tools() {
    let server = test_server();

    let result = call_tool(&server, "get_cluster_overview", json!({})).await;
    assert_eq!(result["isError"], false);
    assert_eq!(
        result["structuredContent"]["summary"],
        "Found 2 pods and 2 services in namespace 'shop'"
    );

    let result = call_tool(&server, "get_pods_from_service", json!({"service_name": "cart"})).await;
    assert_eq!(
        result["structuredContent"]["pods"],
        json!([{"pod_name": "cart-7d9f", "pod_status": "Running"}])
    );

    let result = call_tool(&server, "get_problematic_pods", json!({})).await;
    let pods = result["structuredContent"]["problematic_pods"].as_array().unwrap();
    assert_eq!(pods.len(), 1);
    assert_eq!(pods[0]["pod_name"], "frontend-5c4b");
    assert_eq!(pods[0]["container_issues"][0]["issue_type"], "Pod Pending");

    let result = call_tool(
        &server,
        "get_logs",
        json!({"resource_name": "cart", "resource_type": "service"}),
    )
    .await;
    assert!(result.get("structuredContent").is_none());
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("=== Logs for service 'cart' ==="));
    assert!(text.contains("ERROR connection refused to redis"));
    assert!(!text.contains("cart-7d9f started"));
}

#[tokio::test]
async fn test_metrics_and_trace_tools() {
    let server = test_server();

    let result = call_tool(
        &server,
        "get_metrics",
        json!({"resource_name": "cart-7d9f", "resource_type": "pod"}),
    )
    .await;
    let metrics = &result["structuredContent"];
    assert_eq!(metrics["resource_name"], "cart-7d9f");
    assert_eq!(metrics["metrics"]["container_threads"], 1.0);

    let result = call_tool(&server, "get_traces", json!({"service_name": "frontend"})).await;
    let traces = &result["structuredContent"];
    assert_eq!(traces["traces_count"], 1);
    assert_eq!(traces["traces"][0]["latency_ms"], 42.0);
    assert_eq!(traces["traces"][0]["sequence"], "frontend");

    let result = call_tool(&server, "get_trace", json!({"trace_id": "ffff"})).await;
    assert_eq!(result["structuredContent"]["error"], "Trace with ID 'ffff' not found");
}

#[tokio::test]
async fn test_graph_tools() {
    let server = test_server();

    let result = call_tool(&server, "get_service_summary", json!({"service": "frontend"})).await;
    assert_eq!(
        result["structuredContent"]["summary"],
        "The service frontend uses 1 services to complete its tasks: cart."
    );

    let result = call_tool(&server, "get_dependencies", json!({"service": "frontend"})).await;
    assert_eq!(
        result["structuredContent"],
        json!({"error": "The service frontend has no dependencies", "service": "frontend"})
    );

    let result = call_tool(&server, "get_dependencies", json!({"service": "payments"})).await;
    assert_eq!(
        result["structuredContent"],
        json!({"error": "The service payments doesn't exist in the cluster.", "service": "payments"})
    );
}

#[tokio::test]
async fn test_tool_errors() {
    let server = test_server();

    // Bad arguments fail the tool, not the request
    let result = call_tool(
        &server,
        "get_metrics_range",
        json!({"resource_name": "cart-7d9f", "resource_type": "pod", "time_range_minutes": 0}),
    )
    .await;
    assert_eq!(result["isError"], true);
    assert!(result["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("time_range_minutes"));

    let body = rpc(&server, 3, "tools/call", json!({"name": "get_weather"})).await;
    assert_eq!(body["error"]["code"], -32602);

    let body = rpc(&server, 4, "tools/call", json!({"arguments": {}})).await;
    assert_eq!(body["error"]["code"], -32602);

    let body = rpc(&server, 5, "resources/list", json!({})).await;
    assert_eq!(body["error"]["code"], -32601);
}

#[tokio::test]
async fn test_malformed_requests() {
    let server = test_server();

    let response = server.post("/mcp").text("{not json").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], -32700);
    assert!(body["id"].is_null());

    let response = server.post("/mcp").json(&json!({"jsonrpc": "2.0", "id": 1})).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], -32600);

    let response = server.get("/mcp").await;
    assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_metrics_endpoint_counts_calls() {
    let server = test_server();
    call_tool(&server, "refresh_cache", json!({})).await;

    let response = server.get("/metrics").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let text = response.text();
    assert!(text.contains("cluster_insight_tool_calls_total"));
    assert!(text.contains("tool=\"refresh_cache\""));
}
