//! JSON-RPC 2.0 message types
//!
//! Three envelopes travel over the wire:
//!
//! 1. **Request**: a call that expects a response, correlated by `id`
//! 2. **Notification**: a call without `id`; nobody answers it
//! 3. **Response**: the `result` or `error` for a request, echoing its `id`
//!
//! `JsonRpcMessage` is the untagged union used when the kind of an inbound
//! payload is not known in advance.

use crate::error::{Error, JsonRpcErrorData, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The protocol version every envelope carries
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request id
///
/// Serialized untagged, so `Id::Number(7)` is the bare JSON number `7`.
/// `Hash` + `Eq` make it usable as the key of the pending-request table.
///
/// # Examples
///
/// ```rust
/// use jsonlink_core::Id;
///
/// let id1: Id = "req-123".into();
/// let id2: Id = 42i64.into();
///
/// assert_eq!(id1.to_string(), "\"req-123\"");
/// assert_eq!(id2.to_string(), "42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// String identifier
    String(String),
    /// Numeric identifier
    Number(i64),
    /// Null identifier; servers use it when the request id was unreadable
    Null,
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::String(s) => write!(f, "\"{}\"", s),
            Id::Number(n) => write!(f, "{}", n),
            Id::Null => write!(f, "null"),
        }
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::String(s)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::String(s.to_string())
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Number(n)
    }
}

/// JSON-RPC 2.0 request
///
/// ```rust
/// use jsonlink_core::{JsonRpcRequest, Id};
/// use serde_json::json;
///
/// let req = JsonRpcRequest::new("workspace/get", Some(json!({"id": "ws-1"})), Id::Number(1));
/// assert_eq!(req.jsonrpc, "2.0");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Remote method name
    pub method: String,
    /// Parameters, omitted from the JSON when `None`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    /// Correlation id
    pub id: Id,
}

impl JsonRpcRequest {
    /// Create a request envelope
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>, id: Id) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// JSON-RPC 2.0 notification
///
/// A notification has no `id`. The client sends them to announce intent
/// (e.g. "start pushing events") and receives them as server pushes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Notification name
    pub method: String,
    /// Payload, omitted from the JSON when `None`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcNotification {
    /// Create a notification envelope
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 response
///
/// Exactly one of `result` and `error` is expected. A `"result": null`
/// deserializes to `result: None`; [`JsonRpcResponse::into_outcome`] treats
/// that as a successful `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Successful result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Failure description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorData>,
    /// Id of the request this answers
    pub id: Id,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(result: serde_json::Value, id: Id) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Create an error response
    pub fn error(error: JsonRpcErrorData, id: Id) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// Whether the response carries an `error` object
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Turn the response into the value a request resolves with
    ///
    /// An `error` member wins over `result`; a missing result is `null`.
    pub fn into_outcome(self) -> Result<serde_json::Value> {
        match self.error {
            Some(error) => Err(Error::Rpc(error)),
            None => Ok(self.result.unwrap_or(serde_json::Value::Null)),
        }
    }
}

/// Any inbound JSON-RPC payload
///
/// Variants are tried in declaration order: a payload with `method` and `id`
/// is a request, `method` without `id` a notification, `id` without `method`
/// a response. Arrays are batches whose items are parsed one by one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// Request (the server calling the client)
    Request(JsonRpcRequest),
    /// Notification pushed by the server
    Notification(JsonRpcNotification),
    /// Response to one of our requests
    Response(JsonRpcResponse),
    /// Batch of raw items
    Batch(Vec<serde_json::Value>),
}

impl JsonRpcMessage {
    /// Check if this message is a request
    pub fn is_request(&self) -> bool {
        matches!(self, JsonRpcMessage::Request(_))
    }

    /// Check if this message is a notification
    pub fn is_notification(&self) -> bool {
        matches!(self, JsonRpcMessage::Notification(_))
    }

    /// Check if this message is a response
    pub fn is_response(&self) -> bool {
        matches!(self, JsonRpcMessage::Response(_))
    }

    /// Check if this message is a batch
    pub fn is_batch(&self) -> bool {
        matches!(self, JsonRpcMessage::Batch(_))
    }
}
