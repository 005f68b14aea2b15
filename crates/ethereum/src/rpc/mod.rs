// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! JSON-RPC 2.0 plumbing.

mod http;
mod nonce;

use async_trait::async_trait;
pub use http::HttpTransport;
use ledgerdb_type::{Error, Result};
pub use nonce::NonceSequence;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sends one JSON-RPC request and returns its `result`.
///
/// A node-side error object is reported as [`Error::Rpc`], anything that
/// prevents a well-formed answer as [`Error::Transport`]. A missing or
/// `null` result yields [`Value::Null`].
#[async_trait]
pub trait Transport: Send + Sync {
	async fn request(&self, method: &str, params: Value) -> Result<Value>;
}

#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
	pub jsonrpc: &'static str,
	pub id: u64,
	pub method: &'a str,
	pub params: Value,
}

impl<'a> JsonRpcRequest<'a> {
	pub fn new(id: u64, method: &'a str, params: Value) -> Self {
		Self {
			jsonrpc: "2.0",
			id,
			method,
			params,
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
	#[serde(default)]
	pub result: Option<Value>,
	#[serde(default)]
	pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
	pub code: i64,
	pub message: String,
}

impl JsonRpcResponse {
	pub fn into_result(self) -> Result<Value> {
		if let Some(error) = self.error {
			return Err(Error::Rpc {
				code: error.code,
				message: error.message,
			});
		}
		Ok(self.result.unwrap_or(Value::Null))
	}
}

/// Formats `value` as an Ethereum quantity, e.g. `0x1f`.
pub fn quantity(value: u64) -> String {
	format!("0x{:x}", value)
}

pub fn parse_quantity(value: &Value) -> Result<u64> {
	let text = value.as_str().ok_or_else(|| Error::Decode {
		reason: format!("expected hex quantity, got {}", value),
	})?;
	let digits = ledgerdb_type::util::hex::strip_prefix(text);
	if digits.is_empty() {
		return Ok(0);
	}
	u64::from_str_radix(digits, 16).map_err(|err| Error::Decode {
		reason: format!("invalid hex quantity '{}': {}", text, err),
	})
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn test_request_shape() {
		let request = JsonRpcRequest::new(7, "eth_call", json!([{"to": "0x1"}, "latest"]));
		assert_eq!(
			serde_json::to_value(&request).unwrap(),
			json!({"jsonrpc": "2.0", "id": 7, "method": "eth_call", "params": [{"to": "0x1"}, "latest"]})
		);
	}

	#[test]
	fn test_error_response() {
		let response: JsonRpcResponse =
			serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32000, "message": "nonce too low"}}))
				.unwrap();
		assert_eq!(
			response.into_result().unwrap_err(),
			Error::Rpc {
				code: -32000,
				message: "nonce too low".to_string()
			}
		);
	}

	#[test]
	fn test_null_result() {
		let response: JsonRpcResponse =
			serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1, "result": null})).unwrap();
		assert_eq!(response.into_result().unwrap(), Value::Null);
	}

	#[test]
	fn test_quantity() {
		assert_eq!(quantity(0), "0x0");
		assert_eq!(quantity(255), "0xff");
		assert_eq!(parse_quantity(&json!("0x1f")).unwrap(), 31);
		assert_eq!(parse_quantity(&json!("0x")).unwrap(), 0);
		assert!(parse_quantity(&json!(12)).is_err());
		assert!(parse_quantity(&json!("0xzz")).is_err());
	}
}
