// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Arc;

use async_trait::async_trait;
use ledgerdb_connector::{Connector, ScanVec};
use ledgerdb_type::{ByteKey, ByteValue, Error, PutOp, RemoveOp, Result, TableLayout, TableName, TransactionId};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::{abi, client::EthereumClient};

/// One table backed by a key/value contract.
///
/// Ledger calls on the same table run one at a time; the lock is held until
/// a sent transaction is mined.
pub struct EthereumConnector {
	table: TableName,
	address: String,
	client: Arc<EthereumClient>,
	lock: Mutex<()>,
}

impl EthereumConnector {
	pub fn new(table: TableName, address: impl Into<String>, client: Arc<EthereumClient>) -> Self {
		Self {
			table,
			address: address.into(),
			client,
			lock: Mutex::new(()),
		}
	}

	async fn call(&self, data: String) -> Result<String> {
		let _guard = self.lock.lock().await;
		self.client.call(&self.address, &data).await
	}

	async fn transact(&self, data: String) -> Result<()> {
		let _guard = self.lock.lock().await;
		let receipt = self.client.transact(&self.address, &data).await?;
		debug!(table = %self.table, tx_hash = %receipt.tx_hash, "ledger write mined");
		Ok(())
	}
}

#[async_trait]
impl Connector for EthereumConnector {
	fn table(&self) -> &TableName {
		&self.table
	}

	fn address(&self) -> &str {
		&self.address
	}

	#[instrument(name = "ethereum::connector::get", level = "trace", skip(self), fields(table = %self.table))]
	async fn get(&self, key: &ByteKey) -> Result<ByteValue> {
		let response = self.call(abi::encode_get(key)?).await?;
		abi::decode_get(&response)?.ok_or_else(|| Error::NotFound {
			table: self.table.clone(),
			key: key.clone(),
		})
	}

	#[instrument(name = "ethereum::connector::put", level = "debug", skip(self, key, value), fields(table = %self.table))]
	async fn put(&self, key: &ByteKey, value: &ByteValue, tx: TransactionId) -> Result<()> {
		self.transact(abi::encode_put(key, value, tx)?).await
	}

	#[instrument(name = "ethereum::connector::remove", level = "debug", skip(self, key), fields(table = %self.table))]
	async fn remove(&self, key: &ByteKey, tx: TransactionId) -> Result<()> {
		self.transact(abi::encode_remove(key, tx)?).await
	}

	#[instrument(name = "ethereum::connector::put_batch", level = "debug", skip(self, ops), fields(table = %self.table, count = ops.len()))]
	async fn put_batch(&self, ops: &[PutOp], tx: TransactionId) -> Result<()> {
		if ops.is_empty() {
			return Ok(());
		}
		self.transact(abi::encode_put_batch(ops, tx)?).await
	}

	#[instrument(name = "ethereum::connector::remove_batch", level = "debug", skip(self, ops), fields(table = %self.table, count = ops.len()))]
	async fn remove_batch(&self, ops: &[RemoveOp], tx: TransactionId) -> Result<()> {
		if ops.is_empty() {
			return Ok(());
		}
		self.transact(abi::encode_remove_batch(ops, tx)?).await
	}

	#[instrument(name = "ethereum::connector::table_scan", level = "trace", skip(self), fields(table = %self.table))]
	async fn table_scan_to_vec(&self, layout: TableLayout) -> Result<ScanVec> {
		let response = self.call(abi::encode_table_scan()).await?;
		abi::decode_table_scan(&response, layout)
	}

	#[instrument(name = "ethereum::connector::clear_commit_prepare", level = "debug", skip(self), fields(table = %self.table))]
	async fn clear_commit_prepare(&self, tx: TransactionId) -> Result<()> {
		self.transact(abi::encode_clear_prepare(tx)).await
	}

	#[instrument(name = "ethereum::connector::drop_table", level = "debug", skip(self), fields(table = %self.table))]
	async fn drop_table(&self) -> Result<()> {
		self.transact(abi::encode_drop_table()).await
	}
}
