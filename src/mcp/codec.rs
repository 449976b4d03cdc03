//! JSON-RPC 2.0 envelope encoding and decoding
//!
//! A [`Message`] is always exactly one of request, response, error-response or
//! notification. Its fields are private and the constructors below are the only
//! way to build one, so an invalid shape can only ever come from the wire, where
//! [`decode`] rejects it with a classified [`DecodeError`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::mcp::rpc::RpcError;

pub const JSONRPC_VERSION: &str = "2.0";

/// Request ids are strings or integers and are echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Request,
    Response,
    ErrorResponse,
    Notification,
}

/// Owned view of a message, split by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Request {
        id: RequestId,
        method: String,
        params: Option<Map<String, Value>>,
    },
    Response {
        id: RequestId,
        result: Value,
    },
    ErrorResponse {
        id: Option<RequestId>,
        error: RpcError,
    },
    Notification {
        method: String,
        params: Option<Map<String, Value>>,
    },
}

impl Message {
    fn empty() -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: None,
            method: None,
            params: None,
            result: None,
            error: None,
        }
    }

    pub fn request(
        id: impl Into<RequestId>,
        method: impl Into<String>,
        params: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            method: Some(method.into()),
            params,
            ..Self::empty()
        }
    }

    pub fn response(id: RequestId, result: Value) -> Self {
        Self {
            id: Some(id),
            result: Some(result),
            ..Self::empty()
        }
    }

    /// The id is absent only when the failing request's id could not be read.
    pub fn error_response(id: Option<RequestId>, error: RpcError) -> Self {
        Self {
            id,
            error: Some(error),
            ..Self::empty()
        }
    }

    pub fn notification(method: impl Into<String>, params: Option<Map<String, Value>>) -> Self {
        Self {
            method: Some(method.into()),
            params,
            ..Self::empty()
        }
    }

    pub fn kind(&self) -> MessageKind {
        match (&self.method, &self.id, &self.error) {
            (Some(_), Some(_), _) => MessageKind::Request,
            (Some(_), None, _) => MessageKind::Notification,
            (None, _, Some(_)) => MessageKind::ErrorResponse,
            (None, _, None) => MessageKind::Response,
        }
    }

    pub fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn params(&self) -> Option<&Map<String, Value>> {
        self.params.as_ref()
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&RpcError> {
        self.error.as_ref()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn into_envelope(self) -> Envelope {
        match (self.id, self.method, self.result, self.error) {
            (Some(id), Some(method), _, _) => Envelope::Request {
                id,
                method,
                params: self.params,
            },
            (None, Some(method), _, _) => Envelope::Notification {
                method,
                params: self.params,
            },
            (id, None, _, Some(error)) => Envelope::ErrorResponse { id, error },
            (Some(id), None, result, None) => Envelope::Response {
                id,
                result: result.unwrap_or(Value::Null),
            },
            (None, None, _, None) => unreachable!("responses are always constructed with an id"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not valid JSON")]
    Parse,
    #[error("invalid request: {reason}")]
    InvalidRequest {
        id: Option<RequestId>,
        reason: String,
    },
}

impl DecodeError {
    fn invalid(id: Option<RequestId>, reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            id,
            reason: reason.into(),
        }
    }

    pub fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Parse => None,
            Self::InvalidRequest { id, .. } => id.as_ref(),
        }
    }

    pub fn to_rpc_error(&self) -> RpcError {
        match self {
            Self::Parse => RpcError::parse_error(),
            Self::InvalidRequest { .. } => RpcError::invalid_request(),
        }
    }

    /// The error-response a peer should receive for this failure.
    pub fn into_message(self) -> Message {
        let error = self.to_rpc_error();
        let id = match self {
            Self::Parse => None,
            Self::InvalidRequest { id, .. } => id,
        };
        Message::error_response(id, error)
    }
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    jsonrpc: Option<String>,
    #[serde(default)]
    id: Option<RequestId>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Map<String, Value>>,
    #[serde(default, deserialize_with = "present")]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

// Keeps an explicit `null` distinct from a missing field.
pub(crate) fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

pub fn decode(bytes: &[u8]) -> Result<Message, DecodeError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|_| DecodeError::Parse)?;
    decode_value(value)
}

pub fn decode_value(value: Value) -> Result<Message, DecodeError> {
    if !value.is_object() {
        return Err(DecodeError::invalid(None, "message must be a JSON object"));
    }

    let recovered_id = value
        .get("id")
        .cloned()
        .and_then(|id| serde_json::from_value::<RequestId>(id).ok());

    let raw: RawMessage = serde_json::from_value(value)
        .map_err(|err| DecodeError::invalid(recovered_id.clone(), err.to_string()))?;

    if raw.jsonrpc.as_deref() != Some(JSONRPC_VERSION) {
        return Err(DecodeError::invalid(raw.id, "jsonrpc must be \"2.0\""));
    }

    match (raw.id, raw.method, raw.result, raw.error) {
        (id, Some(method), None, None) => {
            if method.trim().is_empty() {
                return Err(DecodeError::invalid(id, "method must not be empty"));
            }
            Ok(match id {
                Some(id) => Message::request(id, method, raw.params),
                None => Message::notification(method, raw.params),
            })
        }
        (id, Some(_), _, _) => Err(DecodeError::invalid(
            id,
            "method cannot be combined with result or error",
        )),
        (Some(id), None, Some(result), None) => Ok(Message::response(id, result)),
        (id, None, None, Some(error)) => Ok(Message::error_response(id, error)),
        (id, None, Some(_), Some(_)) => Err(DecodeError::invalid(
            id,
            "result and error are mutually exclusive",
        )),
        (None, None, Some(_), None) => Err(DecodeError::invalid(None, "response is missing id")),
        (id, None, None, None) => Err(DecodeError::invalid(
            id,
            "message has neither method nor result/error",
        )),
    }
}

pub fn encode(message: &Message) -> Vec<u8> {
    // Every field is a serde_json value or a plain struct with string keys.
    serde_json::to_vec(message).expect("jsonrpc message serialization")
}
