// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Ledger backend talking to Ethereum smart contracts over JSON-RPC.
//!
//! Every table lives in its own key/value contract; a separate commit
//! contract finalizes prepared state of several tables in one transaction.

pub mod abi;
mod client;
mod config;
mod connector;
pub mod rpc;

use std::sync::Arc;

use async_trait::async_trait;
pub use client::{EthereumClient, Receipt};
pub use config::EthereumConfig;
pub use connector::EthereumConnector;
use ledgerdb_connector::{Connector, ConnectorCache, Ledger};
use ledgerdb_type::{Error, Result, TableName, TransactionId};
use rpc::{HttpTransport, Transport};
use tracing::{debug, instrument};

pub struct Ethereum {
	config: EthereumConfig,
	client: Arc<EthereumClient>,
	connectors: ConnectorCache,
}

impl Ethereum {
	/// Connects to the node at `config.endpoint` over HTTP.
	pub fn new(config: EthereumConfig) -> Result<Self> {
		let transport = Arc::new(HttpTransport::new(config.endpoint.clone()));
		Self::with_transport(config, transport)
	}

	pub fn with_transport(config: EthereumConfig, transport: Arc<dyn Transport>) -> Result<Self> {
		config.validate()?;
		let client = Arc::new(EthereumClient::new(transport, &config));
		Ok(Self {
			config,
			client,
			connectors: ConnectorCache::new(),
		})
	}

	pub fn config(&self) -> &EthereumConfig {
		&self.config
	}

	pub fn client(&self) -> &Arc<EthereumClient> {
		&self.client
	}
}

#[async_trait]
impl Ledger for Ethereum {
	fn connector(&self, table: &TableName) -> Result<Arc<dyn Connector>> {
		self.connectors.get_or_try_insert(table, || {
			let address = self.config.contracts.get(table.as_str()).ok_or_else(|| Error::UnknownTable {
				table: table.clone(),
			})?;
			debug!(%table, %address, "resolved table contract");
			let connector: Arc<dyn Connector> =
				Arc::new(EthereumConnector::new(table.clone(), address.clone(), Arc::clone(&self.client)));
			Ok(connector)
		})
	}

	#[instrument(name = "ethereum::atomic_commit", level = "debug", skip(self, addresses), fields(tables = addresses.len()))]
	async fn atomic_commit(&self, tx: TransactionId, addresses: &[String]) -> Result<()> {
		let data = abi::encode_commit_all(tx, addresses)?;
		let receipt = self.client.transact(&self.config.commit_contract, &data).await?;
		debug!(%tx, tx_hash = %receipt.tx_hash, "atomic commit mined");
		Ok(())
	}
}
