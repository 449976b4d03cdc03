//! The central Model Context Protocol engine
//!
//! Routes decoded JSON-RPC messages to the tool, resource and prompt
//! registries and folds every failure into the error catalog. Each request
//! runs in its own task so a panicking handler cannot take the connection down.

use std::{collections::HashMap, sync::Arc};

use rust_mcp_sdk::schema::{
    CallToolResult, ContentBlock, InitializeResult, ListResourcesResult, ProtocolVersion,
    ReadResourceContent, ReadResourceResult, TextContent, TextResourceContents,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};

use crate::domain::{
    prompts::{GeneratedPrompt, Prompt, PromptRegistry},
    resources::{RegisteredResource, ResourceRegistry},
    tools::{Tool, ToolOutput, ToolRegistry},
    utils::now_utc,
    Collaborators,
};
use crate::errors::{AppError, RegistryError};
use crate::mcp::{
    capabilities::CapabilityRegistry,
    codec::{decode_value, Envelope, Message, RequestId},
    rpc::{app_error_to_rpc, FailureDomain, RpcError},
};

pub const SUPPORTED_PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RpcMethod {
    Initialize,
    ToolsList,
    ToolsCall,
    ResourcesList,
    ResourcesRead,
    PromptsList,
    PromptsGet,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct GetPromptParams {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

pub struct McpServer {
    capabilities: CapabilityRegistry,
    tools: ToolRegistry,
    resources: ResourceRegistry,
    prompts: PromptRegistry,
    collaborators: Collaborators,
    methods: HashMap<&'static str, RpcMethod>,
}

impl McpServer {
    pub fn new(
        capabilities: CapabilityRegistry,
        collaborators: Collaborators,
    ) -> Result<Self, RegistryError> {
        let flags = capabilities.flags();
        let mut methods = HashMap::from([("initialize", RpcMethod::Initialize)]);
        if flags.tools {
            methods.insert("tools/list", RpcMethod::ToolsList);
            methods.insert("tools/call", RpcMethod::ToolsCall);
        }
        if flags.resources {
            methods.insert("resources/list", RpcMethod::ResourcesList);
            methods.insert("resources/read", RpcMethod::ResourcesRead);
        }
        if flags.prompts {
            methods.insert("prompts/list", RpcMethod::PromptsList);
            methods.insert("prompts/get", RpcMethod::PromptsGet);
        }

        Ok(Self {
            capabilities,
            tools: ToolRegistry::builtin()?,
            resources: ResourceRegistry::builtin()?,
            prompts: PromptRegistry::builtin()?,
            collaborators,
            methods,
        })
    }

    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.capabilities
    }

    /// Decodes one JSON value and handles it; `None` means nothing to send back.
    pub async fn handle_json_rpc_value(self: &Arc<Self>, payload: Value) -> Option<Message> {
        match decode_value(payload) {
            Ok(message) => self.handle_message(message).await,
            Err(err) => {
                debug!(reason = %err, "rejected json-rpc message");
                Some(err.into_message())
            }
        }
    }

    pub async fn handle_message(self: &Arc<Self>, message: Message) -> Option<Message> {
        match message.into_envelope() {
            Envelope::Request { id, method, params } => {
                Some(self.handle_request(id, method, params).await)
            }
            Envelope::Notification { method, .. } => {
                debug!(method = %method, "notification acknowledged");
                None
            }
            Envelope::Response { id, .. } => Some(Message::error_response(
                Some(id),
                RpcError::invalid_request(),
            )),
            Envelope::ErrorResponse { id, .. } => {
                Some(Message::error_response(id, RpcError::invalid_request()))
            }
        }
    }

    async fn handle_request(
        self: &Arc<Self>,
        id: RequestId,
        method: String,
        params: Option<Map<String, Value>>,
    ) -> Message {
        let audit_params = redact_audit_params(params.as_ref());

        let outcome = match self.methods.get(method.as_str()).copied() {
            None => Err(RpcError::method_not_found(&method)),
            Some(route) => {
                let server = Arc::clone(self);
                let task = tokio::spawn(async move { server.execute(route, params).await });
                match task.await {
                    Ok(outcome) => outcome,
                    Err(join_error) => {
                        error!(method = %method, error = %join_error, "request handler aborted");
                        Err(RpcError::internal_error("request handler aborted"))
                    }
                }
            }
        };

        let reply = match outcome {
            Ok(result) => Message::response(id, result),
            Err(error) => Message::error_response(Some(id), error),
        };

        info!(
            method = %method,
            params = %audit_params,
            outcome = if reply.is_error() { "failure" } else { "success" },
            "mcp action audited"
        );
        reply
    }

    async fn execute(
        &self,
        route: RpcMethod,
        params: Option<Map<String, Value>>,
    ) -> Result<Value, RpcError> {
        match route {
            RpcMethod::Initialize => self.initialize(),
            RpcMethod::ToolsList => Ok(json!({ "tools": self.list_tools() })),
            RpcMethod::ToolsCall => {
                let params: CallToolParams = required_params(params)?;
                let output = self
                    .call_tool(&params.name, params.arguments.unwrap_or_default())
                    .await
                    .map_err(|err| app_error_to_rpc(FailureDomain::Tool, &err))?;
                tool_result(output)
            }
            RpcMethod::ResourcesList => to_result_value(&ListResourcesResult {
                meta: None,
                next_cursor: None,
                resources: self.resources.list(),
            }),
            RpcMethod::ResourcesRead => {
                let params: ReadResourceParams = required_params(params)?;
                let map_err = |err: AppError| app_error_to_rpc(FailureDomain::Resource, &err);
                let entry = self.resources.lookup(&params.uri).map_err(map_err)?;
                let document = self
                    .read_resource(&params.uri)
                    .await
                    .map_err(map_err)?;
                resource_result(entry, &document)
            }
            RpcMethod::PromptsList => Ok(json!({ "prompts": self.list_prompts() })),
            RpcMethod::PromptsGet => {
                let params: GetPromptParams = required_params(params)?;
                let generated = self
                    .get_prompt(&params.name, &params.arguments.unwrap_or_default())
                    .map_err(|err| app_error_to_rpc(FailureDomain::Prompt, &err))?;
                Ok(prompt_result(&generated))
            }
        }
    }

    fn initialize(&self) -> Result<Value, RpcError> {
        let mut result = to_result_value(&InitializeResult {
            server_info: self.capabilities.server_info(),
            capabilities: self.capabilities.describe(),
            protocol_version: ProtocolVersion::V2024_11_05.into(),
            instructions: None,
            meta: None,
        })?;

        if let Value::Object(map) = &mut result {
            map.insert("initializedAt".to_string(), Value::String(now_utc()));
        }
        Ok(result)
    }

    /// Capability summary served by the REST introspection routes.
    pub fn describe(&self) -> Value {
        json!({
            "capabilities": self.capabilities.describe(),
            "serverInfo": self.capabilities.server_info(),
            "protocolVersion": SUPPORTED_PROTOCOL_VERSION,
        })
    }

    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.list()
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, AppError> {
        self.tools.call(name, arguments, &self.collaborators).await
    }

    pub fn list_resources(&self) -> Vec<rust_mcp_sdk::schema::Resource> {
        self.resources.list()
    }

    pub async fn read_resource(&self, uri: &str) -> Result<Value, AppError> {
        self.resources.read(uri, &self.collaborators).await
    }

    pub fn list_prompts(&self) -> Vec<Prompt> {
        self.prompts.list()
    }

    pub fn get_prompt(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<GeneratedPrompt, AppError> {
        self.prompts.get(name, arguments)
    }
}

fn required_params<T: DeserializeOwned>(params: Option<Map<String, Value>>) -> Result<T, RpcError> {
    let params = params.ok_or_else(|| RpcError::invalid_params("params object is required"))?;
    serde_json::from_value(Value::Object(params))
        .map_err(|err| RpcError::invalid_params(err.to_string()))
}

fn to_result_value<T: Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value)
        .map_err(|err| RpcError::internal_error(format!("result serialization failed: {err}")))
}

fn tool_result(output: ToolOutput) -> Result<Value, RpcError> {
    let text = serde_json::to_string_pretty(&output)
        .map_err(|err| RpcError::internal_error(format!("result serialization failed: {err}")))?;

    to_result_value(&CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(text, None, None))],
        is_error: None,
        meta: None,
        structured_content: Some(output),
    })
}

fn resource_result(entry: &RegisteredResource, document: &Value) -> Result<Value, RpcError> {
    let text = serde_json::to_string_pretty(document)
        .map_err(|err| RpcError::internal_error(format!("resource serialization failed: {err}")))?;

    to_result_value(&ReadResourceResult {
        contents: vec![ReadResourceContent::from(TextResourceContents {
            meta: None,
            mime_type: Some(entry.mime_type().to_string()),
            text,
            uri: entry.resource.uri.clone(),
        })],
        meta: None,
    })
}

pub fn prompt_result(generated: &GeneratedPrompt) -> Value {
    json!({
        "description": format!("Generated prompt for {}", generated.name),
        "messages": [{
            "role": "user",
            "content": { "type": "text", "text": generated.prompt },
        }],
    })
}

pub fn redact_audit_params(params: Option<&Map<String, Value>>) -> Value {
    params
        .map(|map| redact_audit_value(&Value::Object(map.clone())))
        .unwrap_or(Value::Null)
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_audit_value(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        _ => value.clone(),
    }
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "authorization" | "bearer" | "api_key" | "apikey" | "credentials"
    ) || ["token", "secret", "password", "credential"]
        .iter()
        .any(|needle| normalized.contains(needle))
}
