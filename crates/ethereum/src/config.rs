// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{collections::HashMap, time::Duration};

use ledgerdb_type::{Error, Result, TableName};
use serde::{Deserialize, Serialize};

use crate::abi::address_word;

/// Connection settings of the Ethereum backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EthereumConfig {
	/// JSON-RPC endpoint of the node, e.g. `http://127.0.0.1:8545`.
	pub endpoint: String,
	/// Account every transaction is sent from. The node must hold it unlocked.
	pub from: String,
	/// Contract that finalizes prepared state across tables.
	pub commit_contract: String,
	/// Key/value contract of every table.
	pub contracts: HashMap<TableName, String>,
	/// Maximum time to wait for a sent transaction to be mined.
	#[serde(rename = "max_wait_ms", with = "millis")]
	pub max_wait: Duration,
	/// Pause between two receipt polls.
	#[serde(rename = "poll_interval_ms", with = "millis")]
	pub poll_interval: Duration,
	/// Gas limit attached to every transaction.
	pub gas: u64,
}

impl Default for EthereumConfig {
	fn default() -> Self {
		Self {
			endpoint: "http://127.0.0.1:8545".to_string(),
			from: String::new(),
			commit_contract: String::new(),
			contracts: HashMap::new(),
			max_wait: Duration::from_secs(32),
			poll_interval: Duration::from_millis(500),
			gas: 1_000_000,
		}
	}
}

impl EthereumConfig {
	pub fn new(endpoint: impl Into<String>, from: impl Into<String>) -> Self {
		Self {
			endpoint: endpoint.into(),
			from: from.into(),
			..Self::default()
		}
	}

	pub fn with_commit_contract(mut self, address: impl Into<String>) -> Self {
		self.commit_contract = address.into();
		self
	}

	pub fn with_contract(mut self, table: impl Into<TableName>, address: impl Into<String>) -> Self {
		self.contracts.insert(table.into(), address.into());
		self
	}

	pub fn with_contracts(mut self, contracts: HashMap<TableName, String>) -> Self {
		self.contracts.extend(contracts);
		self
	}

	pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
		self.max_wait = max_wait;
		self
	}

	pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
		self.poll_interval = poll_interval;
		self
	}

	pub fn with_gas(mut self, gas: u64) -> Self {
		self.gas = gas;
		self
	}

	/// Parses a contract list of the form `table:address,table:address`.
	pub fn parse_contracts(list: &str) -> Result<HashMap<TableName, String>> {
		let mut contracts = HashMap::new();
		for entry in list.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
			let Some((table, address)) = entry.split_once(':') else {
				return Err(Error::Config {
					reason: format!("contract entry '{}' is missing ':'", entry),
				});
			};
			let (table, address) = (table.trim(), address.trim());
			if table.is_empty() || address.is_empty() {
				return Err(Error::Config {
					reason: format!("contract entry '{}' needs a table and an address", entry),
				});
			}
			contracts.insert(TableName::from(table), address.to_string());
		}
		Ok(contracts)
	}

	pub fn validate(&self) -> Result<()> {
		if self.endpoint.is_empty() {
			return Err(Error::Config {
				reason: "endpoint is empty".to_string(),
			});
		}
		if self.from.is_empty() {
			return Err(Error::Config {
				reason: "sending account is empty".to_string(),
			});
		}
		if self.commit_contract.is_empty() {
			return Err(Error::Config {
				reason: "commit contract is empty".to_string(),
			});
		}
		address_word(&self.from)?;
		address_word(&self.commit_contract)?;
		for address in self.contracts.values() {
			address_word(address)?;
		}
		if self.poll_interval.is_zero() {
			return Err(Error::Config {
				reason: "poll interval must be positive".to_string(),
			});
		}
		if self.max_wait < self.poll_interval {
			return Err(Error::Config {
				reason: format!(
					"maximum wait {:?} is shorter than the poll interval {:?}",
					self.max_wait, self.poll_interval
				),
			});
		}
		Ok(())
	}
}

mod millis {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_u64(duration.as_millis() as u64)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		Ok(Duration::from_millis(u64::deserialize(deserializer)?))
	}
}
