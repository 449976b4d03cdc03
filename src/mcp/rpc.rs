//! JSON-RPC error catalog
//!
//! Every error the server puts on the wire is built here, so codes stay fixed
//! constants. Protocol codes follow JSON-RPC 2.0; domain codes live in the
//! server-defined range.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::AppError;

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

pub const TOOL_ERROR: i64 = -32000;
pub const RESOURCE_ERROR: i64 = -32001;
pub const PROMPT_ERROR: i64 = -32002;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(
        default,
        deserialize_with = "crate::mcp::codec::present",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<Value>,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error() -> Self {
        Self::new(PARSE_ERROR, "Parse error")
    }

    pub fn invalid_request() -> Self {
        Self::new(INVALID_REQUEST, "Invalid Request")
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    pub fn invalid_params(details: impl AsRef<str>) -> Self {
        Self::new(INVALID_PARAMS, format!("Invalid params: {}", details.as_ref()))
    }

    pub fn internal_error(details: impl AsRef<str>) -> Self {
        Self::new(INTERNAL_ERROR, format!("Internal error: {}", details.as_ref()))
    }

    pub fn tool_error(details: impl AsRef<str>) -> Self {
        Self::new(TOOL_ERROR, format!("Tool error: {}", details.as_ref()))
    }

    pub fn resource_error(details: impl AsRef<str>) -> Self {
        Self::new(RESOURCE_ERROR, format!("Resource error: {}", details.as_ref()))
    }

    pub fn prompt_error(details: impl AsRef<str>) -> Self {
        Self::new(PROMPT_ERROR, format!("Prompt error: {}", details.as_ref()))
    }
}

/// Which failure domain an `AppError` surfaced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDomain {
    Tool,
    Resource,
    Prompt,
    Internal,
}

pub fn app_error_to_rpc(domain: FailureDomain, err: &AppError) -> RpcError {
    let details = err.to_string();
    let error = match domain {
        FailureDomain::Tool => RpcError::tool_error(details),
        FailureDomain::Resource => RpcError::resource_error(details),
        FailureDomain::Prompt => RpcError::prompt_error(details),
        FailureDomain::Internal => RpcError::internal_error(details),
    };

    error.with_data(json!({ "code": err.code() }))
}
