//! Axum HTTP handlers for the web server
//!
//! Provides the JSON-RPC `/mcp` endpoint, the REST introspection mirrors and
//! general metadata endpoints.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::error;

use crate::domain::utils::into_object;
use crate::errors::AppError;
use crate::mcp::{
    codec::{DecodeError, Message},
    rpc::RpcError,
    server::SUPPORTED_PROTOCOL_VERSION,
};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    pub name: String,
    pub version: String,
    pub mcp_endpoint: &'static str,
    pub protocol_version: &'static str,
    pub transport: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ReadResourceQuery {
    pub uri: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn discovery(State(state): State<AppState>) -> Json<DiscoveryResponse> {
    let info = state.server.capabilities().server_info();
    Json(DiscoveryResponse {
        name: info.name,
        version: info.version,
        mcp_endpoint: "/mcp",
        protocol_version: SUPPORTED_PROTOCOL_VERSION,
        transport: "http",
    })
}

pub async fn mcp_endpoint(State(state): State<AppState>, body: Bytes) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => return (StatusCode::OK, Json(DecodeError::Parse.into_message())).into_response(),
    };

    if let Value::Array(batch) = payload {
        if batch.is_empty() {
            return (
                StatusCode::OK,
                Json(vec![Message::error_response(None, RpcError::invalid_request())]),
            )
                .into_response();
        }

        let mut responses = Vec::with_capacity(batch.len());
        for item in batch {
            if let Some(response) = state.server.handle_json_rpc_value(item).await {
                responses.push(response);
            }
        }

        if responses.is_empty() {
            return StatusCode::NO_CONTENT.into_response();
        }

        return (StatusCode::OK, Json(responses)).into_response();
    }

    match state.server.handle_json_rpc_value(payload).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

fn ensure_enabled(enabled: bool, subsystem: &'static str) -> Result<(), AppError> {
    if enabled {
        Ok(())
    } else {
        Err(AppError::not_found(
            "capability_disabled",
            format!("{subsystem} capability is disabled"),
        ))
    }
}

/// Optional JSON object body; empty means no arguments.
fn object_body(body: &Bytes) -> Result<Map<String, Value>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(AppError::bad_request(
            "invalid_body",
            "request body must be a JSON object",
        )),
    }
}

pub async fn capabilities(State(state): State<AppState>) -> Json<Value> {
    Json(state.server.describe())
}

pub async fn list_tools(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    ensure_enabled(state.server.capabilities().flags().tools, "tools")?;
    let tools = state.server.list_tools();
    Ok(Json(json!({ "count": tools.len(), "tools": tools })))
}

pub async fn call_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    ensure_enabled(state.server.capabilities().flags().tools, "tools")?;
    let arguments = object_body(&body)?;

    let server = Arc::clone(&state.server);
    let tool = name.clone();
    let outcome = tokio::spawn(async move { server.call_tool(&tool, arguments).await })
        .await
        .unwrap_or_else(|join_error| {
            error!(tool = %name, error = %join_error, "tool handler aborted");
            Err(AppError::internal("tool handler aborted"))
        });

    Ok(Json(match outcome {
        Ok(result) => json!({ "tool": name, "result": result, "success": true }),
        Err(err) => json!({ "tool": name, "error": err.to_string(), "success": false }),
    }))
}

pub async fn list_resources(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    ensure_enabled(state.server.capabilities().flags().resources, "resources")?;
    let resources = state.server.list_resources();
    Ok(Json(json!({ "count": resources.len(), "resources": resources })))
}

pub async fn read_resource(
    State(state): State<AppState>,
    Query(query): Query<ReadResourceQuery>,
) -> Result<Json<Value>, AppError> {
    ensure_enabled(state.server.capabilities().flags().resources, "resources")?;

    Ok(Json(match state.server.read_resource(&query.uri).await {
        Ok(content) => json!({ "uri": query.uri, "content": content, "success": true }),
        Err(err) => json!({ "uri": query.uri, "error": err.to_string(), "success": false }),
    }))
}

pub async fn list_prompts(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    ensure_enabled(state.server.capabilities().flags().prompts, "prompts")?;
    let prompts = state.server.list_prompts();
    Ok(Json(json!({ "count": prompts.len(), "prompts": prompts })))
}

pub async fn get_prompt(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    ensure_enabled(state.server.capabilities().flags().prompts, "prompts")?;
    let arguments = object_body(&body)?;

    Ok(Json(match state.server.get_prompt(&name, &arguments) {
        Ok(content) => json!({ "prompt": name, "content": content, "success": true }),
        Err(err) => json!({ "prompt": name, "error": err.to_string(), "success": false }),
    }))
}

pub async fn demo(State(state): State<AppState>) -> Json<Value> {
    let arguments = into_object(json!({ "type": "users", "count": 3 }));
    let sample = match state
        .server
        .call_tool("generate_test_data", arguments.clone())
        .await
    {
        Ok(result) => Value::Object(result),
        Err(err) => json!({ "error": err.to_string() }),
    };

    Json(json!({
        "serverInfo": state.server.capabilities().server_info(),
        "capabilities": state.server.capabilities().describe(),
        "protocolVersion": SUPPORTED_PROTOCOL_VERSION,
        "sample": {
            "tool": "generate_test_data",
            "arguments": arguments,
            "result": sample,
        },
    }))
}
