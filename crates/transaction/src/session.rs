// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{collections::HashMap, sync::Arc};

use ledgerdb_connector::{Ledger, ScanVec};
use ledgerdb_type::{
	ByteKey, ByteValue, Error, PutOp, RemoveOp, Result, TableLayout, TableName, TransactionId,
};
use tracing::{debug, instrument};

use crate::{
	config::TransactionConfig,
	coordinator::{Transaction, TransactionState},
	table::TableTransaction,
};

/// Scan cursor of one table.
enum Scan {
	/// Outside a transaction: a one-shot snapshot of the ledger.
	Snapshot {
		rows: ScanVec,
		cursor: usize,
	},
	/// Inside a transaction: walks the table buffer's cache.
	Buffered {
		cursor: usize,
	},
}

/// Entry point of the storage engine into the ledger.
///
/// Holds at most one open [`Transaction`]. Without one, every operation goes
/// straight to the ledger with [`TransactionId::NONE`].
pub struct Session {
	ledger: Arc<dyn Ledger>,
	config: TransactionConfig,
	transaction: Option<Transaction>,
	scans: HashMap<TableName, Scan>,
}

impl Session {
	pub fn new(ledger: Arc<dyn Ledger>, config: TransactionConfig) -> Self {
		Self {
			ledger,
			config,
			transaction: None,
			scans: HashMap::new(),
		}
	}

	pub fn ledger(&self) -> &Arc<dyn Ledger> {
		&self.ledger
	}

	pub fn config(&self) -> &TransactionConfig {
		&self.config
	}

	pub fn transaction(&self) -> Option<&Transaction> {
		self.transaction.as_ref()
	}

	pub fn in_transaction(&self) -> bool {
		self.transaction.is_some()
	}

	/// Id of the open transaction, starting one if there is none.
	pub fn begin_or_join_transaction(&mut self) -> TransactionId {
		let ledger = &self.ledger;
		let config = self.config;
		self.transaction.get_or_insert_with(|| Transaction::begin(Arc::clone(ledger), config)).id()
	}

	pub async fn put(&mut self, table: &TableName, key: ByteKey, value: ByteValue) -> Result<()> {
		match self.transaction.as_mut() {
			Some(tx) => {
				tx.table(table)?.add_put(PutOp::new(table.clone(), key, value));
				Ok(())
			}
			None => self.ledger.connector(table)?.put(&key, &value, TransactionId::NONE).await,
		}
	}

	/// Removes `key`. With `deferred`, a remove issued while the table is
	/// being scanned inside a transaction takes effect at [`Self::end_scan`].
	pub async fn remove(&mut self, table: &TableName, key: ByteKey, deferred: bool) -> Result<()> {
		match self.transaction.as_mut() {
			Some(tx) => {
				tx.table(table)?.add_remove(RemoveOp::new(table.clone(), key), deferred);
				Ok(())
			}
			None => self.ledger.connector(table)?.remove(&key, TransactionId::NONE).await,
		}
	}

	/// Value stored under `key`, cut to the layout's value width. Inside a
	/// transaction the table's own uncommitted writes are visible. Without
	/// the scan cache, reads outside a scan go to the ledger every time.
	pub async fn get(&mut self, table: &TableName, key: &ByteKey, layout: TableLayout) -> Result<ByteValue> {
		let Some(tx) = self.transaction.as_mut() else {
			let value = self.ledger.connector(table)?.get(key).await?;
			return Ok(value.truncated(layout.value_len));
		};

		let buffer = tx.table(table)?;
		if !self.config.scan_cache && !buffer.is_cache_filled() {
			let value = match buffer.buffered(key) {
				Some(Some(value)) => value.clone(),
				Some(None) => {
					return Err(Error::NotFound {
						table: table.clone(),
						key: key.clone(),
					});
				}
				None => Arc::clone(buffer.connector()).get(key).await?,
			};
			return Ok(value.truncated(layout.value_len));
		}

		fill_cache(buffer, layout).await?;
		buffer.cached(key).map(|value| value.truncated(layout.value_len)).ok_or_else(|| Error::NotFound {
			table: table.clone(),
			key: key.clone(),
		})
	}

	/// Positions a cursor before the first row of `table`.
	#[instrument(name = "session::start_scan", level = "trace", skip(self, layout))]
	pub async fn start_scan(&mut self, table: &TableName, layout: TableLayout) -> Result<()> {
		let scan = match self.transaction.as_mut() {
			Some(tx) => {
				let buffer = tx.table(table)?;
				if !self.config.scan_cache {
					buffer.clear_cache();
				}
				fill_cache(buffer, layout).await?;
				buffer.begin_scan();
				Scan::Buffered {
					cursor: 0,
				}
			}
			None => Scan::Snapshot {
				rows: self.ledger.connector(table)?.table_scan_to_vec(layout).await?,
				cursor: 0,
			},
		};
		self.scans.insert(table.clone(), scan);
		Ok(())
	}

	/// Next row of the scan on `table`, or `None` once it is exhausted.
	pub fn scan_next(&mut self, table: &TableName) -> Result<Option<(ByteKey, ByteValue)>> {
		let position = match self.scans.get(table) {
			Some(Scan::Snapshot {
				cursor,
				..
			})
			| Some(Scan::Buffered {
				cursor,
			}) => *cursor,
			None => {
				return Err(Error::ScanNotStarted {
					table: table.clone(),
				});
			}
		};
		self.scan_at(table, position)
	}

	/// Row at `position` of the scan on `table`; the cursor moves behind it.
	pub fn scan_at(&mut self, table: &TableName, position: usize) -> Result<Option<(ByteKey, ByteValue)>> {
		let buffer = self.transaction.as_ref().and_then(|tx| tx.get_table(table));
		let scan = self.scans.get_mut(table).ok_or_else(|| Error::ScanNotStarted {
			table: table.clone(),
		})?;

		let (row, cursor) = match scan {
			Scan::Snapshot {
				rows,
				cursor,
			} => (rows.get(position).cloned(), cursor),
			Scan::Buffered {
				cursor,
			} => {
				let row = buffer
					.and_then(|buffer| buffer.scan_entry(position))
					.map(|(key, value)| (key.clone(), value.clone()));
				(row, cursor)
			}
		};

		if row.is_some() {
			*cursor = position + 1;
		}
		Ok(row)
	}

	/// Closes the scan on `table` and applies removes deferred during it.
	pub fn end_scan(&mut self, table: &TableName) -> Result<()> {
		if self.scans.remove(table).is_none() {
			return Err(Error::ScanNotStarted {
				table: table.clone(),
			});
		}

		if let Some(buffer) = self.transaction.as_mut().and_then(|tx| tx.get_table_mut(table)) {
			buffer.end_scan();
			if !self.config.scan_cache {
				buffer.clear_cache();
			}
		}
		Ok(())
	}

	/// Commits the open transaction, if any. The session is back in
	/// autocommit afterwards, whatever the outcome.
	pub async fn commit(&mut self) -> Result<TransactionState> {
		self.scans.clear();
		let Some(mut tx) = self.transaction.take() else {
			return Ok(TransactionState::Committed);
		};
		tx.commit().await?;
		Ok(tx.state())
	}

	pub async fn rollback(&mut self) -> Result<TransactionState> {
		self.scans.clear();
		let Some(mut tx) = self.transaction.take() else {
			return Ok(TransactionState::RolledBack);
		};
		tx.rollback().await?;
		Ok(tx.state())
	}

	/// Drops `table` on the ledger right away, outside any transaction.
	pub async fn drop_table(&mut self, table: &TableName) -> Result<()> {
		debug!(%table, "dropping table");
		self.scans.remove(table);
		self.ledger.connector(table)?.drop_table().await
	}
}

/// Loads the ledger snapshot into `buffer` unless it already holds one.
async fn fill_cache(buffer: &mut TableTransaction, layout: TableLayout) -> Result<()> {
	if buffer.is_cache_filled() {
		return Ok(());
	}
	let connector = Arc::clone(buffer.connector());
	let entries = connector.table_scan_to_map(layout).await?;
	buffer.load_cache(entries);
	Ok(())
}
