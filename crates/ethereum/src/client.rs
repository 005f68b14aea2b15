// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{sync::Arc, time::Duration};

use ledgerdb_type::{Error, Result};
use serde_json::{Value, json};
use tokio::time::{Instant, sleep};
use tracing::{debug, instrument, warn};

use crate::{
	config::EthereumConfig,
	rpc::{NonceSequence, Transport, parse_quantity, quantity},
};

/// Sends calls and transactions for one account.
///
/// Every connector of an [`crate::Ethereum`] ledger shares one client, and
/// with it one nonce sequence.
pub struct EthereumClient {
	transport: Arc<dyn Transport>,
	from: String,
	gas: u64,
	max_wait: Duration,
	poll_interval: Duration,
	nonces: NonceSequence,
}

/// Outcome of a mined transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
	pub tx_hash: String,
	pub block_number: Option<u64>,
}

impl EthereumClient {
	pub fn new(transport: Arc<dyn Transport>, config: &EthereumConfig) -> Self {
		Self {
			transport,
			from: config.from.clone(),
			gas: config.gas,
			max_wait: config.max_wait,
			poll_interval: config.poll_interval,
			nonces: NonceSequence::new(),
		}
	}

	pub fn account(&self) -> &str {
		&self.from
	}

	/// Number of transactions of the sending account, pending ones included.
	pub async fn transaction_count(&self) -> Result<u64> {
		let count = self.transport.request("eth_getTransactionCount", json!([self.from, "pending"])).await?;
		parse_quantity(&count)
	}

	/// Read-only contract call against the latest block; returns the raw hex
	/// answer.
	#[instrument(name = "ethereum::client::call", level = "trace", skip(self, data))]
	pub async fn call(&self, to: &str, data: &str) -> Result<String> {
		let result = self
			.transport
			.request(
				"eth_call",
				json!([{
					"from": self.from,
					"to": to,
					"data": data,
				}, "latest"]),
			)
			.await?;

		match result {
			Value::String(hex) => Ok(hex),
			Value::Null => Ok("0x".to_string()),
			other => Err(Error::Decode {
				reason: format!("eth_call returned {}", other),
			}),
		}
	}

	/// Submits a state changing transaction and waits until it is mined.
	///
	/// A rejected nonce is retried with a fresh one until `max_wait` has
	/// passed since the first attempt. Any other rejection makes the next
	/// send reload the pending count, so the unused nonce leaves no gap.
	#[instrument(name = "ethereum::client::transact", level = "debug", skip(self, data))]
	pub async fn transact(&self, to: &str, data: &str) -> Result<Receipt> {
		let started = Instant::now();

		let tx_hash = loop {
			let nonce = self.nonces.next(|| self.transaction_count()).await?;
			match self.submit(to, data, nonce).await {
				Ok(hash) => break hash,
				Err(err) if err.is_retryable() => {
					warn!(nonce, error = %err, "nonce rejected, retrying");
					if started.elapsed() >= self.max_wait {
						return Err(Error::ConfirmationTimeout {
							tx_hash: "unsubmitted".to_string(),
							waited: started.elapsed(),
						});
					}
				}
				Err(err) => {
					warn!(nonce, error = %err, "transaction rejected, resyncing nonce");
					self.nonces.invalidate();
					return Err(err);
				}
			}
		};

		debug!(%tx_hash, "transaction submitted");
		self.wait_for_receipt(&tx_hash, started).await
	}

	async fn submit(&self, to: &str, data: &str, nonce: u64) -> Result<String> {
		let result = self
			.transport
			.request(
				"eth_sendTransaction",
				json!([{
					"from": self.from,
					"to": to,
					"data": data,
					"gas": quantity(self.gas),
					"nonce": quantity(nonce),
				}]),
			)
			.await
			.map_err(|err| classify(err, nonce))?;

		result.as_str().map(str::to_string).ok_or_else(|| Error::Decode {
			reason: format!("eth_sendTransaction returned {}", result),
		})
	}

	async fn wait_for_receipt(&self, tx_hash: &str, started: Instant) -> Result<Receipt> {
		loop {
			let receipt = self.transport.request("eth_getTransactionReceipt", json!([tx_hash])).await?;
			if !receipt.is_null() {
				return decode_receipt(tx_hash, &receipt);
			}
			if started.elapsed() >= self.max_wait {
				return Err(Error::ConfirmationTimeout {
					tx_hash: tx_hash.to_string(),
					waited: started.elapsed(),
				});
			}
			sleep(self.poll_interval).await;
		}
	}
}

/// Nonce races surface as plain JSON-RPC errors; pick them out by message.
fn classify(err: Error, nonce: u64) -> Error {
	match err {
		Error::Rpc {
			message,
			..
		} if is_nonce_conflict(&message) => Error::NonceConflict {
			nonce,
			message,
		},
		other => other,
	}
}

fn is_nonce_conflict(message: &str) -> bool {
	let message = message.to_ascii_lowercase();
	message.contains("nonce too low") || message.contains("already known")
}

fn decode_receipt(tx_hash: &str, receipt: &Value) -> Result<Receipt> {
	if let Some(status) = receipt.get("status").filter(|status| !status.is_null()) {
		if parse_quantity(status)? == 0 {
			return Err(Error::Reverted {
				tx_hash: tx_hash.to_string(),
			});
		}
	}

	let block_number = match receipt.get("blockNumber") {
		Some(number) if !number.is_null() => Some(parse_quantity(number)?),
		_ => None,
	};

	Ok(Receipt {
		tx_hash: tx_hash.to_string(),
		block_number,
	})
}
