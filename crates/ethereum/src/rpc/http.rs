// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use ledgerdb_type::{Error, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::trace;

use super::{JsonRpcRequest, JsonRpcResponse, Transport};

/// JSON-RPC over HTTP POST.
pub struct HttpTransport {
	client: Client,
	endpoint: String,
	next_id: AtomicU64,
}

impl HttpTransport {
	pub fn new(endpoint: impl Into<String>) -> Self {
		Self {
			client: Client::new(),
			endpoint: endpoint.into(),
			next_id: AtomicU64::new(1),
		}
	}

	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}
}

#[async_trait]
impl Transport for HttpTransport {
	async fn request(&self, method: &str, params: Value) -> Result<Value> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		trace!(id, method, "sending json-rpc request");

		let response = self
			.client
			.post(&self.endpoint)
			.json(&JsonRpcRequest::new(id, method, params))
			.send()
			.await
			.map_err(transport_error)?
			.error_for_status()
			.map_err(transport_error)?;

		let body: JsonRpcResponse = response.json().await.map_err(transport_error)?;
		body.into_result()
	}
}

fn transport_error(err: reqwest::Error) -> Error {
	Error::Transport {
		reason: err.to_string(),
	}
}
