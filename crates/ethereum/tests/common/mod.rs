// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Scripted in-process node for driving the Ethereum backend in tests.

#![allow(dead_code)]

use std::{
	collections::HashMap,
	sync::Arc,
	time::Duration,
};

use async_trait::async_trait;
use ledgerdb_ethereum::{
	Ethereum, EthereumConfig,
	rpc::{Transport, parse_quantity},
};
use ledgerdb_type::{Error, Result};
use parking_lot::Mutex;
use serde_json::{Value, json};

pub const FROM: &str = "0x00000000000000000000000000000000000000f0";
pub const COMMIT: &str = "0x00000000000000000000000000000000000000c0";
pub const USERS: &str = "0x00000000000000000000000000000000000000a1";
pub const ORDERS: &str = "0x00000000000000000000000000000000000000a2";

#[derive(Debug, Clone)]
pub struct Sent {
	pub to: String,
	pub data: String,
	pub nonce: u64,
}

#[derive(Default)]
pub struct NodeState {
	pub pending_count: u64,
	pub count_requests: usize,
	/// Nonces answered with the given error message instead of a hash.
	pub rejections: HashMap<u64, String>,
	/// Error message for every submission, regardless of nonce.
	pub reject_all: Option<String>,
	/// Accepted transactions in submission order.
	pub sent: Vec<Sent>,
	/// Receipt polls answered with `null` before the receipt shows up.
	pub pending_polls: usize,
	pub never_mine: bool,
	pub revert: bool,
	/// Answers of `eth_call`, keyed by `to` and the four byte selector.
	pub call_responses: HashMap<(String, String), String>,
	pub calls: Vec<(String, String)>,
	in_flight: HashMap<String, usize>,
	pub max_in_flight: HashMap<String, usize>,
	polls: HashMap<String, usize>,
	hash_owner: HashMap<String, String>,
}

#[derive(Default)]
pub struct MockNode {
	pub state: Mutex<NodeState>,
}

impl MockNode {
	pub fn new(pending_count: u64) -> Arc<Self> {
		let node = Self::default();
		node.state.lock().pending_count = pending_count;
		Arc::new(node)
	}

	pub fn reject(&self, nonce: u64, message: &str) {
		self.state.lock().rejections.insert(nonce, message.to_string());
	}

	pub fn respond_to_call(&self, to: &str, selector: &str, response: impl Into<String>) {
		self.state.lock().call_responses.insert((to.to_string(), selector.to_string()), response.into());
	}

	pub fn sent(&self) -> Vec<Sent> {
		self.state.lock().sent.clone()
	}

	pub fn sent_nonces(&self) -> Vec<u64> {
		self.state.lock().sent.iter().map(|sent| sent.nonce).collect()
	}
}

#[async_trait]
impl Transport for MockNode {
	async fn request(&self, method: &str, params: Value) -> Result<Value> {
		let mut guard = self.state.lock();
		let state = &mut *guard;
		match method {
			"eth_getTransactionCount" => {
				state.count_requests += 1;
				Ok(json!(format!("0x{:x}", state.pending_count)))
			}
			"eth_sendTransaction" => {
				let tx = &params[0];
				let nonce = parse_quantity(&tx["nonce"])?;
				if let Some(message) = state.reject_all.clone().or_else(|| state.rejections.get(&nonce).cloned()) {
					return Err(Error::Rpc {
						code: -32000,
						message,
					});
				}
				let to = tx["to"].as_str().unwrap_or_default().to_string();
				let data = tx["data"].as_str().unwrap_or_default().to_string();

				let in_flight = state.in_flight.entry(to.clone()).or_default();
				*in_flight += 1;
				let current = *in_flight;
				let max = state.max_in_flight.entry(to.clone()).or_default();
				*max = (*max).max(current);

				let hash = format!("0x{:064x}", state.sent.len() + 1);
				state.hash_owner.insert(hash.clone(), to.clone());
				state.sent.push(Sent {
					to,
					data,
					nonce,
				});
				Ok(json!(hash))
			}
			"eth_getTransactionReceipt" => {
				let hash = params[0].as_str().unwrap_or_default().to_string();
				if state.never_mine {
					return Ok(Value::Null);
				}
				let polls = state.polls.entry(hash.clone()).or_default();
				*polls += 1;
				if *polls <= state.pending_polls {
					return Ok(Value::Null);
				}
				if let Some(owner) = state.hash_owner.get(&hash).cloned() {
					if let Some(in_flight) = state.in_flight.get_mut(&owner) {
						*in_flight = in_flight.saturating_sub(1);
					}
				}
				let status = if state.revert {
					"0x0"
				} else {
					"0x1"
				};
				Ok(json!({"transactionHash": hash, "status": status, "blockNumber": "0x10"}))
			}
			"eth_call" => {
				let to = params[0]["to"].as_str().unwrap_or_default().to_string();
				let data = params[0]["data"].as_str().unwrap_or_default().to_string();
				state.calls.push((to.clone(), data.clone()));
				let selector = data.get(..10).unwrap_or_default().to_string();
				Ok(state.call_responses.get(&(to, selector)).map(|response| json!(response)).unwrap_or(json!("0x")))
			}
			other => Err(Error::Rpc {
				code: -32601,
				message: format!("method {} not found", other),
			}),
		}
	}
}

pub fn config() -> EthereumConfig {
	EthereumConfig::new("http://mock-node", FROM)
		.with_commit_contract(COMMIT)
		.with_contract("users", USERS)
		.with_contract("orders", ORDERS)
		.with_max_wait(Duration::from_secs(2))
		.with_poll_interval(Duration::from_millis(5))
}

pub fn ethereum(node: &Arc<MockNode>) -> Ethereum {
	ethereum_with(node, config())
}

pub fn ethereum_with(node: &Arc<MockNode>, config: EthereumConfig) -> Ethereum {
	let transport: Arc<dyn Transport> = node.clone();
	Ethereum::with_transport(config, transport).unwrap()
}

/// Hex answer of `tableScan()` holding the given rows.
pub fn scan_response(rows: &[(&str, &str)]) -> String {
	let word = |text: &str| {
		let bytes = text.as_bytes();
		let mut word = [0u8; 32];
		word[..bytes.len()].copy_from_slice(bytes);
		ledgerdb_type::util::hex::encode(word)
	};
	let uint = |value: usize| format!("{:064x}", value);

	let mut out = String::from("0x");
	out.push_str(&uint(0x40));
	out.push_str(&uint(0x60 + 32 * rows.len()));
	out.push_str(&uint(rows.len()));
	for (key, _) in rows.iter().copied() {
		out.push_str(&word(key));
	}
	out.push_str(&uint(rows.len()));
	for (_, value) in rows.iter().copied() {
		out.push_str(&word(value));
	}
	out
}

/// Hex answer of `get(bytes32)`.
pub fn get_response(value: Option<&str>) -> String {
	let mut word = [0u8; 32];
	let found = match value.map(str::as_bytes) {
		Some(bytes) => {
			word[..bytes.len()].copy_from_slice(bytes);
			1
		}
		None => 0,
	};
	format!("0x{:064x}{}", found, ledgerdb_type::util::hex::encode(word))
}
