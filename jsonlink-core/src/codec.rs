//! Codec for JSON-RPC message serialization and deserialization
//!
//! Encoding is plain serde; decoding adds the batch detection and error
//! mapping the client relies on:
//!
//! - anything that is not valid JSON, or is valid JSON but no JSON-RPC
//!   envelope, becomes `Error::MalformedMessage`
//! - an object whose `jsonrpc` member is missing or not "2.0" is rejected
//!   the same way
//! - a JSON array becomes `JsonRpcMessage::Batch` with the items left raw, so
//!   one bad item does not poison the rest
//!
//! # Examples
//!
//! ```rust
//! use jsonlink_core::{codec, JsonRpcRequest, Id};
//!
//! let request = JsonRpcRequest::new("ping", None, Id::Number(1));
//! let json = codec::encode_request(&request).unwrap();
//!
//! let decoded = codec::decode(&json).unwrap();
//! assert!(decoded.is_request());
//! ```

use crate::error::{Error, Result};
use crate::types::{
    Id, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION,
};
use serde::Serialize;

/// Encode any serializable message to a JSON string
pub fn encode<T: Serialize>(msg: &T) -> Result<String> {
    serde_json::to_string(msg).map_err(|e| Error::Serialization(e.to_string()))
}

/// Encode a request envelope
pub fn encode_request(req: &JsonRpcRequest) -> Result<String> {
    encode(req)
}

/// Encode a notification envelope
pub fn encode_notification(notif: &JsonRpcNotification) -> Result<String> {
    encode(notif)
}

/// Encode a response envelope
pub fn encode_response(resp: &JsonRpcResponse) -> Result<String> {
    encode(resp)
}

/// Convert call-site params into the optional `params` member
///
/// Params that serialize to JSON `null` (`()`, `None`) are omitted from the
/// envelope instead of being sent as `"params": null`.
///
/// ```rust
/// use jsonlink_core::codec;
/// use serde_json::json;
///
/// assert_eq!(codec::encode_params(()).unwrap(), None);
/// assert_eq!(codec::encode_params(None::<u8>).unwrap(), None);
/// assert_eq!(codec::encode_params(json!([1, 2])).unwrap(), Some(json!([1, 2])));
/// ```
pub fn encode_params<P: Serialize>(params: P) -> Result<Option<serde_json::Value>> {
    let value = serde_json::to_value(params).map_err(|e| Error::Serialization(e.to_string()))?;
    Ok(match value {
        serde_json::Value::Null => None,
        other => Some(other),
    })
}

/// Decode an inbound payload (single message or batch)
///
/// # Errors
///
/// `Error::MalformedMessage` when the text is not JSON, is an empty batch,
/// or is not shaped like any JSON-RPC envelope.
pub fn decode(data: &str) -> Result<JsonRpcMessage> {
    let value: serde_json::Value = serde_json::from_str(data)
        .map_err(|e| Error::MalformedMessage(format!("invalid JSON: {}", e)))?;
    decode_value(value)
}

/// Decode an already-parsed JSON value
///
/// Used for the individual items of a batch.
pub fn decode_value(value: serde_json::Value) -> Result<JsonRpcMessage> {
    match value {
        serde_json::Value::Array(items) => {
            if items.is_empty() {
                return Err(Error::MalformedMessage("empty batch".to_string()));
            }
            Ok(JsonRpcMessage::Batch(items))
        }
        other => {
            match other.get("jsonrpc").and_then(serde_json::Value::as_str) {
                Some(JSONRPC_VERSION) => {}
                Some(version) => {
                    return Err(Error::MalformedMessage(format!(
                        "unsupported jsonrpc version {:?}",
                        version
                    )))
                }
                None if other.is_object() => {
                    return Err(Error::MalformedMessage("missing jsonrpc version".to_string()))
                }
                None => {}
            }
            serde_json::from_value(other)
                .map_err(|_| Error::MalformedMessage("not a JSON-RPC 2.0 envelope".to_string()))
        }
    }
}

/// Id of something that looks like a response, even if it failed to decode
///
/// Lets the client settle the request a broken response was meant for.
/// Objects carrying a `method` and null ids yield `None`.
pub fn response_id(value: &serde_json::Value) -> Option<Id> {
    let object = value.as_object()?;
    if object.contains_key("method") {
        return None;
    }
    match serde_json::from_value(object.get("id")?.clone()).ok()? {
        Id::Null => None,
        id => Some(id),
    }
}
