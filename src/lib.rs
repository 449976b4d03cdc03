use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

pub mod analysis_engine;
pub mod auth;
pub mod config;
pub mod data_generator;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;

use mcp::server::McpServer;

#[derive(Clone)]
pub struct AppState {
    pub api_token: Option<Arc<str>>,
    pub server: Arc<McpServer>,
}

impl AppState {
    pub fn new(api_token: Option<String>, server: McpServer) -> Self {
        Self {
            api_token: api_token.map(Arc::<str>::from),
            server: Arc::new(server),
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/mcp", post(http::handlers::mcp_endpoint))
        .route("/mcp/capabilities", get(http::handlers::capabilities))
        .route("/mcp/tools", get(http::handlers::list_tools))
        .route("/mcp/tools/{name}/call", post(http::handlers::call_tool))
        .route("/mcp/resources", get(http::handlers::list_resources))
        .route("/mcp/resources/read", get(http::handlers::read_resource))
        .route("/mcp/prompts", get(http::handlers::list_prompts))
        .route("/mcp/prompts/{name}/get", post(http::handlers::get_prompt))
        .route("/mcp/demo", get(http::handlers::demo))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer_token,
        ));

    Router::new()
        .route("/health", get(http::handlers::health))
        .route("/.well-known/mcp", get(http::handlers::discovery))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{
        domain::Collaborators,
        mcp::capabilities::{CapabilityFlags, CapabilityRegistry, ServerIdentity},
    };

    use super::*;

    const TOKEN: &str = "token-1234567890ab";

    fn app_with(api_token: Option<&str>, flags: CapabilityFlags) -> Router {
        let server = McpServer::new(
            CapabilityRegistry::new(flags, ServerIdentity::default()),
            Collaborators::default(),
        )
        .expect("builtin registries are unique");
        build_app(AppState::new(api_token.map(str::to_string), server))
    }

    fn app() -> Router {
        app_with(Some(TOKEN), CapabilityFlags::default())
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<&str>) -> Response {
        let builder = Request::builder()
            .uri(uri)
            .method(method)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"));
        let body = body.map_or_else(Body::empty, |text| Body::from(text.to_string()));

        app.oneshot(builder.body(body).expect("request build"))
            .await
            .expect("request execution")
    }

    async fn rpc(body: &str) -> Response {
        send(app(), "POST", "/mcp", Some(body)).await
    }

    async fn body_json(response: Response) -> Value {
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        serde_json::from_slice(&body).expect("valid json response")
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .method("GET")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        assert_eq!(body, "{\"status\":\"ok\"}");
    }

    #[tokio::test]
    async fn discovery_is_public() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/.well-known/mcp")
                    .method("GET")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let body_json = body_json(response).await;
        assert_eq!(body_json["mcp_endpoint"], "/mcp");
        assert_eq!(body_json["name"], "qa-automation-hub");
    }

    #[tokio::test]
    async fn mcp_requires_token_when_configured() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/mcp")
                    .method("POST")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#))
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/mcp/tools")
                    .method("GET")
                    .header(header::AUTHORIZATION, "Bearer wrong-token")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn mcp_is_open_without_configured_token() {
        let response = app_with(None, CapabilityFlags::default())
            .oneshot(
                Request::builder()
                    .uri("/mcp")
                    .method("POST")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#))
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn mcp_unknown_method_returns_method_not_found() {
        let response = rpc(r#"{"jsonrpc":"2.0","id":1,"method":"unknown"}"#).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body_json = body_json(response).await;
        assert_eq!(
            body_json,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32601, "message": "Method not found: unknown" }
            })
        );
    }

    #[tokio::test]
    async fn mcp_initialize_returns_result() {
        let response = rpc(
            r#"{"jsonrpc":"2.0","id":"init-1","method":"initialize","params":{"protocolVersion":"2024-11-05","clientInfo":{"name":"test-client","version":"1.0.0"},"capabilities":{}}}"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body_json = body_json(response).await;
        assert_eq!(body_json["id"], "init-1");
        assert_eq!(body_json["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(
            body_json["result"]["capabilities"]["resources"],
            json!({ "subscribe": true, "listChanged": true })
        );
        assert_eq!(
            body_json["result"]["serverInfo"]["description"],
            "QA Automation Service Hub"
        );
    }

    #[tokio::test]
    async fn mcp_tools_list_returns_builtin_tools() {
        let body_json = body_json(rpc(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).await).await;

        let names: Vec<&str> = body_json["result"]["tools"]
            .as_array()
            .expect("tools array")
            .iter()
            .filter_map(|tool| tool["name"].as_str())
            .collect();
        assert_eq!(names.len(), 5);
        assert_eq!(names[0], "generate_test_data");
        assert!(body_json["result"]["tools"][0]["inputSchema"]["properties"]["count"].is_object());
    }

    #[tokio::test]
    async fn mcp_tools_call_generates_users() {
        let body_json = body_json(
            rpc(r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"generate_test_data","arguments":{"type":"users","count":3}}}"#)
                .await,
        )
        .await;

        let structured = &body_json["result"]["structuredContent"];
        assert_eq!(structured["type"], "users");
        assert_eq!(structured["data"].as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn mcp_tools_call_unknown_tool_returns_tool_error() {
        let body_json = body_json(
            rpc(r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"missing_tool","arguments":{}}}"#)
                .await,
        )
        .await;

        assert_eq!(body_json["id"], 4);
        assert_eq!(body_json["error"]["code"], -32000);
        assert_eq!(body_json["error"]["data"]["code"], "tool_not_found");
    }

    #[tokio::test]
    async fn mcp_tools_call_malformed_params_returns_invalid_params() {
        let body_json = body_json(
            rpc(r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"arguments":{}}}"#).await,
        )
        .await;

        assert_eq!(body_json["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn mcp_resources_read_returns_users() {
        let body_json = body_json(
            rpc(r#"{"jsonrpc":"2.0","id":6,"method":"resources/read","params":{"uri":"qa-hub://test-data/users"}}"#)
                .await,
        )
        .await;

        let contents = &body_json["result"]["contents"][0];
        assert_eq!(contents["uri"], "qa-hub://test-data/users");
        assert_eq!(contents["mimeType"], "application/json");
        assert!(contents["text"].is_string());
    }

    #[tokio::test]
    async fn mcp_resources_read_unknown_uri_returns_resource_error() {
        let body_json = body_json(
            rpc(r#"{"jsonrpc":"2.0","id":7,"method":"resources/read","params":{"uri":"qa-hub://nonexistent"}}"#)
                .await,
        )
        .await;

        assert_eq!(body_json["error"]["code"], -32001);
        assert_eq!(body_json["error"]["data"]["code"], "resource_not_found");
    }

    #[tokio::test]
    async fn mcp_prompts_get_fills_missing_arguments() {
        let body_json = body_json(
            rpc(r#"{"jsonrpc":"2.0","id":8,"method":"prompts/get","params":{"name":"analyze_test_results","arguments":{}}}"#)
                .await,
        )
        .await;

        let text = body_json["result"]["messages"][0]["content"]["text"]
            .as_str()
            .expect("prompt text");
        assert!(text.contains("Not specified"));
    }

    #[tokio::test]
    async fn mcp_notification_returns_no_content() {
        let response = rpc(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn mcp_batch_notifications_return_no_content() {
        let response = rpc(
            r#"[{"jsonrpc":"2.0","method":"notifications/initialized"},{"jsonrpc":"2.0","method":"tools/list","params":{}}]"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn mcp_batch_mixed_requests_return_only_id_responses() {
        let response = rpc(
            r#"[{"jsonrpc":"2.0","method":"notifications/initialized"},{"jsonrpc":"2.0","id":100,"method":"initialize"},{"jsonrpc":"2.0","id":200,"method":"tools/list","params":{}}]"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body_json = body_json(response).await;
        let ids: Vec<i64> = body_json
            .as_array()
            .expect("batch response array")
            .iter()
            .filter_map(|item| item["id"].as_i64())
            .collect();
        assert_eq!(ids, vec![100, 200]);
    }

    #[tokio::test]
    async fn mcp_empty_batch_is_invalid_request() {
        let body_json = body_json(rpc("[]").await).await;

        assert_eq!(body_json[0]["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn mcp_parse_error_for_invalid_json() {
        let response = rpc(r#"{"jsonrpc":"2.0","id":1,"method":"#).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body_json = body_json(response).await;
        assert_eq!(body_json["error"]["code"], -32700);
        assert!(body_json.get("id").is_none());
    }

    #[tokio::test]
    async fn mcp_response_sent_to_server_is_invalid_request() {
        let body_json = body_json(rpc(r#"{"jsonrpc":"2.0","id":9,"result":{}}"#).await).await;

        assert_eq!(body_json["id"], 9);
        assert_eq!(body_json["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn rest_tools_mirror_lists_and_calls() {
        let listed = body_json(send(app(), "GET", "/mcp/tools", None).await).await;
        assert_eq!(listed["count"], 5);

        let called = body_json(
            send(
                app(),
                "POST",
                "/mcp/tools/generate_test_data/call",
                Some(r#"{"type":"products","count":2}"#),
            )
            .await,
        )
        .await;
        assert_eq!(called["success"], true);
        assert_eq!(called["tool"], "generate_test_data");
        assert_eq!(called["result"]["data"].as_array().map(Vec::len), Some(2));

        let failed = body_json(send(app(), "POST", "/mcp/tools/nope/call", None).await).await;
        assert_eq!(failed["success"], false);
        assert_eq!(failed["error"], "Unknown tool: nope");
    }

    #[tokio::test]
    async fn rest_tool_failure_is_reported_in_envelope() {
        let response = send(
            app(),
            "POST",
            "/mcp/tools/generate_test_report/call",
            Some(r#"{"test_results":{"passed":18446744073709551615,"failed":1}}"#),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body_json = body_json(response).await;
        assert_eq!(body_json["success"], false);
        assert_eq!(body_json["tool"], "generate_test_report");
        assert!(body_json["error"]
            .as_str()
            .is_some_and(|error| error.contains("exceed")));
    }

    #[tokio::test]
    async fn rest_mirror_rejects_non_object_body() {
        let response = send(app(), "POST", "/mcp/tools/generate_test_data/call", Some("[1,2]")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body_json = body_json(response).await;
        assert_eq!(body_json["code"], "invalid_body");
    }

    #[tokio::test]
    async fn rest_resources_and_prompts_mirrors() {
        let resources = body_json(send(app(), "GET", "/mcp/resources", None).await).await;
        assert_eq!(resources["count"], 5);

        let read = body_json(
            send(
                app(),
                "GET",
                "/mcp/resources/read?uri=qa-hub://reports/latest",
                None,
            )
            .await,
        )
        .await;
        assert_eq!(read["success"], true);
        assert_eq!(read["content"]["total_tests"], 125);

        let missing = body_json(
            send(app(), "GET", "/mcp/resources/read?uri=qa-hub://nonexistent", None).await,
        )
        .await;
        assert_eq!(missing["success"], false);

        let prompts = body_json(send(app(), "GET", "/mcp/prompts", None).await).await;
        assert_eq!(prompts["count"], 4);

        let prompt = body_json(
            send(
                app(),
                "POST",
                "/mcp/prompts/create_bug_report/get",
                Some(r#"{"failure_details":"checkout 500"}"#),
            )
            .await,
        )
        .await;
        assert_eq!(prompt["success"], true);
        assert!(prompt["content"]["prompt"]
            .as_str()
            .is_some_and(|text| text.contains("checkout 500")));
    }

    #[tokio::test]
    async fn rest_capabilities_and_demo() {
        let capabilities = body_json(send(app(), "GET", "/mcp/capabilities", None).await).await;
        assert_eq!(capabilities["protocolVersion"], "2024-11-05");
        assert!(capabilities["capabilities"]["tools"].is_object());

        let demo = body_json(send(app(), "GET", "/mcp/demo", None).await).await;
        assert_eq!(demo["sample"]["result"]["data"].as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn disabled_capability_is_hidden_from_mirrors_and_rpc() {
        let flags = CapabilityFlags {
            tools: true,
            resources: false,
            prompts: true,
        };

        let response = send(app_with(Some(TOKEN), flags), "GET", "/mcp/resources", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(
            app_with(Some(TOKEN), flags),
            "POST",
            "/mcp",
            Some(r#"{"jsonrpc":"2.0","id":1,"method":"resources/list"}"#),
        )
        .await;
        let body_json = body_json(response).await;
        assert_eq!(body_json["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn root_get_is_not_found() {
        let response = send(app(), "GET", "/", None).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
