//! Core JSON-RPC 2.0 types and codec for jsonlink
//!
//! This crate holds everything that does not depend on a connection:
//!
//! - **Types**: request, notification and response envelopes, request ids
//! - **Codec**: encoding outbound envelopes and classifying inbound payloads
//! - **Error handling**: the error taxonomy shared by all jsonlink crates
//! - **Observability**: tracing subscriber and OpenTelemetry bootstrap
//!
//! The crate is transport-agnostic; `jsonlink-client` adds connections,
//! correlation and notification dispatch on top of it.
//!
//! # Example
//!
//! ```rust
//! use jsonlink_core::{codec, Id, JsonRpcMessage, JsonRpcRequest};
//!
//! let request = JsonRpcRequest::new("workspace/list", None, Id::Number(1));
//! let json = codec::encode_request(&request).unwrap();
//!
//! match codec::decode(&json).unwrap() {
//!     JsonRpcMessage::Request(decoded) => assert_eq!(decoded.method, "workspace/list"),
//!     _ => unreachable!(),
//! }
//! ```

pub mod codec;
pub mod error;
pub mod observability;
pub mod types;

pub use error::{Error, JsonRpcErrorData, Result};
pub use observability::{init_observability, shutdown_observability, ObservabilityConfig};
pub use types::{
    Id, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION,
};
