// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{fmt, sync::Arc};

use indexmap::{IndexMap, IndexSet};
use ledgerdb_connector::{Connector, Ledger};
use ledgerdb_type::{Error, Result, TableName, TransactionId};
use tracing::{debug, error, instrument, warn};

use crate::{config::TransactionConfig, table::TableTransaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
	Open,
	Preparing,
	Committed,
	RolledBack,
	/// The atomic commit call itself failed. What the ledger kept is up to the
	/// ledger.
	Failed,
}

impl TransactionState {
	pub fn is_terminal(&self) -> bool {
		matches!(self, TransactionState::Committed | TransactionState::RolledBack | TransactionState::Failed)
	}

	fn name(&self) -> &'static str {
		match self {
			TransactionState::Open => "open",
			TransactionState::Preparing => "preparing",
			TransactionState::Committed => "committed",
			TransactionState::RolledBack => "rolled back",
			TransactionState::Failed => "failed",
		}
	}
}

impl fmt::Display for TransactionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// One logical transaction spanning any number of tables.
pub struct Transaction {
	id: TransactionId,
	ledger: Arc<dyn Ledger>,
	config: TransactionConfig,
	tables: IndexMap<TableName, TableTransaction>,
	state: TransactionState,
}

impl Transaction {
	pub fn begin(ledger: Arc<dyn Ledger>, config: TransactionConfig) -> Self {
		let id = TransactionId::generate();
		debug!(tx = %id, "transaction started");
		Self {
			id,
			ledger,
			config,
			tables: IndexMap::new(),
			state: TransactionState::Open,
		}
	}

	pub fn id(&self) -> TransactionId {
		self.id
	}

	pub fn state(&self) -> TransactionState {
		self.state
	}

	pub fn config(&self) -> &TransactionConfig {
		&self.config
	}

	/// Buffer of `table`, joining the table to this transaction on first use.
	pub fn table(&mut self, table: &TableName) -> Result<&mut TableTransaction> {
		self.ensure_open()?;
		if !self.tables.contains_key(table) {
			let connector = self.ledger.connector(table)?;
			self.tables.insert(table.clone(), TableTransaction::new(connector, self.id, self.config.prepare_immediately));
		}
		self.tables.get_mut(table).ok_or_else(|| Error::UnknownTable {
			table: table.clone(),
		})
	}

	pub fn get_table(&self, table: &TableName) -> Option<&TableTransaction> {
		self.tables.get(table)
	}

	pub fn get_table_mut(&mut self, table: &TableName) -> Option<&mut TableTransaction> {
		self.tables.get_mut(table)
	}

	pub fn tables(&self) -> impl Iterator<Item = &TableName> {
		self.tables.keys()
	}

	/// Prepares every written table and finalizes them in one atomic commit.
	///
	/// When a table fails to prepare, the staged state of every table that
	/// got this far is cleared and the transaction ends rolled back.
	#[instrument(name = "transaction::commit", level = "debug", skip(self), fields(tx = %self.id, tables = self.tables.len()))]
	pub async fn commit(&mut self) -> Result<()> {
		self.ensure_open()?;
		self.state = TransactionState::Preparing;

		for buffer in self.tables.values_mut() {
			buffer.end_scan();
		}

		let mut buffers = std::mem::take(&mut self.tables).into_values();
		let mut affected: Vec<Arc<dyn Connector>> = Vec::new();
		let mut failed = None;

		for mut buffer in buffers.by_ref() {
			if buffer.is_read_only() {
				buffer.dispose().await;
				continue;
			}

			affected.push(Arc::clone(buffer.connector()));
			let prepared = self.prepare(&mut buffer).await;
			let table = buffer.table().clone();
			buffer.dispose().await;
			if !prepared {
				failed = Some(table);
				break;
			}
		}

		if let Some(table) = failed {
			for buffer in buffers {
				if buffer.prepare_immediately() && !buffer.is_read_only() {
					affected.push(Arc::clone(buffer.connector()));
				}
				buffer.dispose().await;
			}
			self.clear_prepared(&affected).await;
			self.state = TransactionState::RolledBack;
			warn!(tx = %self.id, %table, "prepare failed, transaction rolled back");
			return Err(Error::PrepareFailed {
				table,
				tx: self.id,
			});
		}

		if affected.is_empty() {
			self.state = TransactionState::Committed;
			debug!(tx = %self.id, "read-only transaction committed");
			return Ok(());
		}

		let addresses: Vec<String> =
			affected.iter().map(|connector| connector.address().to_string()).collect::<IndexSet<_>>().into_iter().collect();

		match self.ledger.atomic_commit(self.id, &addresses).await {
			Ok(()) => {
				self.state = TransactionState::Committed;
				debug!(tx = %self.id, tables = addresses.len(), "transaction committed");
				Ok(())
			}
			Err(err) => {
				self.state = TransactionState::Failed;
				error!(tx = %self.id, error = %err, "atomic commit failed");
				Err(Error::AtomicCommitFailed {
					tx: self.id,
					reason: err.to_string(),
				})
			}
		}
	}

	/// Discards all buffered writes. Writes already staged on the ledger by
	/// immediate prepare are cleared there as well.
	#[instrument(name = "transaction::rollback", level = "debug", skip(self), fields(tx = %self.id))]
	pub async fn rollback(&mut self) -> Result<()> {
		self.ensure_open()?;

		let mut staged: Vec<Arc<dyn Connector>> = Vec::new();
		for buffer in std::mem::take(&mut self.tables).into_values() {
			if buffer.prepare_immediately() && !buffer.is_read_only() {
				staged.push(Arc::clone(buffer.connector()));
			}
			buffer.dispose().await;
		}

		let result = self.clear_prepared(&staged).await;
		self.state = TransactionState::RolledBack;
		debug!(tx = %self.id, "transaction rolled back");
		result
	}

	async fn prepare(&self, buffer: &mut TableTransaction) -> bool {
		if buffer.prepare_immediately() {
			return buffer.wait_for_prepare_workers().await;
		}

		let connector = Arc::clone(buffer.connector());
		let result = async {
			connector.put_batch(&buffer.put_ops(), self.id).await?;
			connector.remove_batch(&buffer.remove_ops(), self.id).await
		}
		.await;

		match result {
			Ok(()) => true,
			Err(err) => {
				warn!(tx = %self.id, table = %buffer.table(), error = %err, "batch prepare failed");
				false
			}
		}
	}

	/// Sends `clear_commit_prepare` to every connector, even after a failure.
	/// Returns the first failure.
	async fn clear_prepared(&self, connectors: &[Arc<dyn Connector>]) -> Result<()> {
		let mut first_error = None;
		for connector in connectors {
			if let Err(err) = connector.clear_commit_prepare(self.id).await {
				warn!(tx = %self.id, table = %connector.table(), error = %err, "clearing prepared state failed");
				first_error.get_or_insert(err);
			}
		}
		match first_error {
			Some(err) => Err(err),
			None => Ok(()),
		}
	}

	fn ensure_open(&self) -> Result<()> {
		if self.state == TransactionState::Open {
			return Ok(());
		}
		Err(Error::TransactionClosed {
			tx: self.id,
			state: self.state.name(),
		})
	}
}

impl Drop for Transaction {
	fn drop(&mut self) {
		if !self.state.is_terminal() && !self.tables.is_empty() {
			warn!(tx = %self.id, tables = self.tables.len(), "transaction dropped without commit or rollback");
		}
	}
}
