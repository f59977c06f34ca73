//! Error types for jsonlink
//!
//! Two error types live here:
//!
//! - **Error**: the client-side taxonomy every fallible operation returns
//! - **JsonRpcErrorData**: the wire-format `error` object of a JSON-RPC 2.0
//!   response, carried verbatim inside `Error::Rpc`
//!
//! # Propagation
//!
//! Protocol-level failures (`ConnectFailed`, `ConnectionLost`, `Rpc`,
//! `TransportUnavailable`, `Timeout`) reach the caller through the returned
//! `Result`. `MalformedMessage` and `Handler` describe inbound traffic and
//! handler failures; the client logs them and keeps processing, they are never
//! returned from a public call.
//!
//! # Examples
//!
//! ```rust
//! use jsonlink_core::{Error, JsonRpcErrorData};
//!
//! let wire = JsonRpcErrorData::method_not_found("workspace/start");
//! assert_eq!(wire.code, -32601);
//!
//! let error = Error::Rpc(wire);
//! assert!(error.is_rpc());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for jsonlink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for jsonlink operations
///
/// `Error` is `Clone` because a single connect attempt may be awaited by
/// several callers, and each of them receives the same outcome.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The server answered a request with an `error` object
    #[error("RPC error: {0}")]
    Rpc(#[from] JsonRpcErrorData),

    /// Resolving the entrypoint or opening the transport failed
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    /// The connection dropped while the request was pending
    #[error("Connection lost")]
    ConnectionLost,

    /// A request was attempted while the client was not connected
    #[error("Transport unavailable: client is not connected")]
    TransportUnavailable,

    /// An inbound payload could not be parsed as a JSON-RPC message
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// A notification handler failed or panicked
    #[error("Notification handler failed: {0}")]
    Handler(String),

    /// No response arrived within the configured request timeout
    #[error("Request timeout")]
    Timeout,

    /// Params or result could not be converted to or from JSON
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An internal invariant was violated
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error carries a server-side `error` object
    pub fn is_rpc(&self) -> bool {
        matches!(self, Error::Rpc(_))
    }

    /// The wire error object, if the server produced one
    pub fn rpc_data(&self) -> Option<&JsonRpcErrorData> {
        match self {
            Error::Rpc(data) => Some(data),
            _ => None,
        }
    }

    /// Short, stable label used as a metrics attribute
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Rpc(_) => "rpc",
            Error::ConnectFailed(_) => "connect_failed",
            Error::ConnectionLost => "connection_lost",
            Error::TransportUnavailable => "transport_unavailable",
            Error::MalformedMessage(_) => "malformed_message",
            Error::Handler(_) => "handler",
            Error::Timeout => "timeout",
            Error::Serialization(_) => "serialization",
            Error::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// JSON-RPC 2.0 error object
///
/// This is the exact wire shape of the `error` member of a response:
/// `code` and `message` are mandatory, `data` is optional and opaque.
///
/// Reserved codes:
/// - `-32700`: Parse error
/// - `-32600`: Invalid Request
/// - `-32601`: Method not found
/// - `-32602`: Invalid params
/// - `-32603`: Internal error
/// - `-32000 to -32099`: Server error (implementation-defined)
///
/// # Examples
///
/// ```rust
/// use jsonlink_core::JsonRpcErrorData;
/// use serde_json::json;
///
/// let custom = JsonRpcErrorData::with_data(
///     1001,
///     "Workspace is stopping",
///     json!({"workspaceId": "ws-42"})
/// );
/// assert_eq!(custom.data.unwrap()["workspaceId"], "ws-42");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorData {
    /// Numeric error code
    pub code: i32,

    /// Short description of the error
    pub message: String,

    /// Additional, server-defined information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcErrorData {
    /// Create an error object with code and message
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create an error object carrying extra `data`
    pub fn with_data(code: i32, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Parse error (-32700)
    pub fn parse_error() -> Self {
        Self::new(-32700, "Parse error")
    }

    /// Method not found (-32601)
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::new(-32601, format!("Method not found: {}", method.into()))
    }

    /// Invalid params (-32602)
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::new(-32602, msg)
    }

    /// Internal error (-32603)
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::new(-32603, msg)
    }
}

impl std::fmt::Display for JsonRpcErrorData {
    /// Formats as "[code] message", e.g. "[-32601] Method not found: foo"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcErrorData {}
