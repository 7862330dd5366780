//! JSON-RPC 2.0 envelope (spec.md §4.7, §6). Compact request/reply shapes,
//! no batching — one request per connection (see `mod.rs` framing).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

#[derive(Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Value,
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: Value,
}

#[derive(Debug, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Response {
        Response { jsonrpc: "2.0", result: Some(result), error: None, id }
    }

    pub fn failure(id: Value, err: &ProtocolError) -> Response {
        Response {
            jsonrpc: "2.0",
            result: None,
            error: Some(RpcError { code: err.code(), message: err.message() }),
            id,
        }
    }

    /// A parse failure has no request to echo an `id` from — JSON-RPC calls
    /// for `null` here.
    pub fn parse_failure(err: &ProtocolError) -> Response {
        Response::failure(Value::Null, err)
    }
}
