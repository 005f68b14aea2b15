// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! A ledger living in process memory.
//!
//! Behaves like a contract backed ledger: direct writes land immediately,
//! writes tagged with a transaction id stay staged per table until
//! [`Ledger::atomic_commit`] applies them or
//! [`Connector::clear_commit_prepare`] discards them. Every call is recorded
//! and failures can be injected per table.

use std::{
	collections::{HashMap, HashSet},
	sync::Arc,
	time::Duration,
};

use async_trait::async_trait;
use indexmap::IndexMap;
use ledgerdb_connector::{Connector, ConnectorCache, Ledger, ScanVec};
use ledgerdb_type::{ByteKey, ByteValue, Error, PutOp, RemoveOp, Result, TableLayout, TableName, TransactionId};
use parking_lot::Mutex;
use tokio::time::sleep;
use tracing::trace;

/// One call that reached the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCall {
	Put {
		table: TableName,
		tx: TransactionId,
	},
	Remove {
		table: TableName,
		tx: TransactionId,
	},
	PutBatch {
		table: TableName,
		tx: TransactionId,
		len: usize,
	},
	RemoveBatch {
		table: TableName,
		tx: TransactionId,
		len: usize,
	},
	Scan {
		table: TableName,
	},
	ClearPrepare {
		table: TableName,
		tx: TransactionId,
	},
	DropTable {
		table: TableName,
	},
	AtomicCommit {
		tx: TransactionId,
		addresses: Vec<String>,
	},
}

#[derive(Debug, Clone)]
enum Staged {
	Put(ByteKey, ByteValue),
	Remove(ByteKey),
}

#[derive(Default)]
struct TableState {
	rows: IndexMap<ByteKey, ByteValue>,
	staged: HashMap<TransactionId, Vec<Staged>>,
}

impl TableState {
	fn apply(&mut self, op: Staged) {
		match op {
			Staged::Put(key, value) => {
				self.rows.insert(key, value);
			}
			Staged::Remove(key) => {
				self.rows.shift_remove(&key);
			}
		}
	}

	fn write(&mut self, op: Staged, tx: TransactionId) {
		if tx.is_none() {
			self.apply(op);
		} else {
			self.staged.entry(tx).or_default().push(op);
		}
	}
}

#[derive(Default)]
struct State {
	tables: HashMap<TableName, TableState>,
	calls: Vec<LedgerCall>,
	failing_tables: HashSet<TableName>,
	fail_commit: bool,
}

#[derive(Default)]
struct Shared {
	state: Mutex<State>,
	latency: Mutex<Option<Duration>>,
}

impl Shared {
	async fn delay(&self) {
		let latency = *self.latency.lock();
		if let Some(latency) = latency {
			sleep(latency).await;
		}
	}
}

#[derive(Default, Clone)]
pub struct MemoryLedger {
	shared: Arc<Shared>,
	connectors: Arc<ConnectorCache>,
}

impl MemoryLedger {
	pub fn new() -> Self {
		Self::default()
	}

	/// Address under which `table` takes part in an atomic commit.
	pub fn address_of(table: &str) -> String {
		format!("memory:{}", table)
	}

	/// Every staged write to `table` fails from now on.
	pub fn fail_prepare(&self, table: impl Into<TableName>) {
		self.shared.state.lock().failing_tables.insert(table.into());
	}

	/// The next atomic commits fail.
	pub fn fail_commit(&self) {
		self.shared.state.lock().fail_commit = true;
	}

	/// Removes every injected failure.
	pub fn heal(&self) {
		let mut state = self.shared.state.lock();
		state.failing_tables.clear();
		state.fail_commit = false;
	}

	/// Makes every mutating call wait `latency` before it takes effect.
	pub fn with_latency(self, latency: Duration) -> Self {
		*self.shared.latency.lock() = Some(latency);
		self
	}

	/// Writes a row directly, bypassing any transaction.
	pub fn insert(&self, table: impl Into<TableName>, key: impl Into<ByteKey>, value: impl Into<ByteValue>) {
		let mut state = self.shared.state.lock();
		state.tables.entry(table.into()).or_default().rows.insert(key.into(), value.into());
	}

	/// Committed rows of `table` in ledger order.
	pub fn rows(&self, table: &str) -> ScanVec {
		let state = self.shared.state.lock();
		state.tables
			.get(table)
			.map(|table| table.rows.iter().map(|(key, value)| (key.clone(), value.clone())).collect())
			.unwrap_or_default()
	}

	pub fn row(&self, table: &str, key: &[u8]) -> Option<ByteValue> {
		let state = self.shared.state.lock();
		state.tables.get(table).and_then(|table| table.rows.get(key).cloned())
	}

	/// Number of writes staged on `table` for `tx`.
	pub fn staged(&self, table: &str, tx: TransactionId) -> usize {
		let state = self.shared.state.lock();
		state.tables.get(table).and_then(|table| table.staged.get(&tx)).map(Vec::len).unwrap_or(0)
	}

	/// Whether any table still holds staged writes of `tx`.
	pub fn has_staged(&self, tx: TransactionId) -> bool {
		let state = self.shared.state.lock();
		state.tables.values().any(|table| table.staged.get(&tx).is_some_and(|ops| !ops.is_empty()))
	}

	pub fn calls(&self) -> Vec<LedgerCall> {
		self.shared.state.lock().calls.clone()
	}

	pub fn clear_calls(&self) {
		self.shared.state.lock().calls.clear();
	}

	/// Transaction ids and addresses of every atomic commit attempt.
	pub fn commits(&self) -> Vec<(TransactionId, Vec<String>)> {
		self.calls()
			.into_iter()
			.filter_map(|call| match call {
				LedgerCall::AtomicCommit {
					tx,
					addresses,
				} => Some((tx, addresses)),
				_ => None,
			})
			.collect()
	}

	/// Tables whose staged state was discarded, in call order.
	pub fn cleared(&self) -> Vec<(TableName, TransactionId)> {
		self.calls()
			.into_iter()
			.filter_map(|call| match call {
				LedgerCall::ClearPrepare {
					table,
					tx,
				} => Some((table, tx)),
				_ => None,
			})
			.collect()
	}
}

#[async_trait]
impl Ledger for MemoryLedger {
	fn connector(&self, table: &TableName) -> Result<Arc<dyn Connector>> {
		self.connectors.get_or_try_insert(table, || {
			let connector: Arc<dyn Connector> = Arc::new(MemoryConnector {
				table: table.clone(),
				address: Self::address_of(table),
				shared: Arc::clone(&self.shared),
			});
			Ok(connector)
		})
	}

	async fn atomic_commit(&self, tx: TransactionId, addresses: &[String]) -> Result<()> {
		self.shared.delay().await;

		let mut state = self.shared.state.lock();
		state.calls.push(LedgerCall::AtomicCommit {
			tx,
			addresses: addresses.to_vec(),
		});
		if state.fail_commit {
			return Err(Error::Transport {
				reason: "injected commit failure".to_string(),
			});
		}

		for address in addresses {
			let Some(table) = address.strip_prefix("memory:") else {
				return Err(Error::Config {
					reason: format!("unknown address {}", address),
				});
			};
			let table = state.tables.entry(TableName::from(table)).or_default();
			for op in table.staged.remove(&tx).unwrap_or_default() {
				table.apply(op);
			}
		}
		trace!(%tx, tables = addresses.len(), "memory ledger committed");
		Ok(())
	}
}

pub struct MemoryConnector {
	table: TableName,
	address: String,
	shared: Arc<Shared>,
}

impl MemoryConnector {
	/// Records `call` and stages or applies `ops` unless the table is failing.
	async fn write(&self, call: LedgerCall, ops: Vec<Staged>, tx: TransactionId) -> Result<()> {
		self.shared.delay().await;

		let mut state = self.shared.state.lock();
		state.calls.push(call);
		if !tx.is_none() && state.failing_tables.contains(&self.table) {
			return Err(Error::Transport {
				reason: format!("injected prepare failure on {}", self.table),
			});
		}
		let table = state.tables.entry(self.table.clone()).or_default();
		for op in ops {
			table.write(op, tx);
		}
		Ok(())
	}
}

#[async_trait]
impl Connector for MemoryConnector {
	fn table(&self) -> &TableName {
		&self.table
	}

	fn address(&self) -> &str {
		&self.address
	}

	async fn get(&self, key: &ByteKey) -> Result<ByteValue> {
		let state = self.shared.state.lock();
		state.tables.get(&self.table).and_then(|table| table.rows.get(key).cloned()).ok_or_else(|| {
			Error::NotFound {
				table: self.table.clone(),
				key: key.clone(),
			}
		})
	}

	async fn put(&self, key: &ByteKey, value: &ByteValue, tx: TransactionId) -> Result<()> {
		let call = LedgerCall::Put {
			table: self.table.clone(),
			tx,
		};
		self.write(call, vec![Staged::Put(key.clone(), value.clone())], tx).await
	}

	async fn remove(&self, key: &ByteKey, tx: TransactionId) -> Result<()> {
		let call = LedgerCall::Remove {
			table: self.table.clone(),
			tx,
		};
		self.write(call, vec![Staged::Remove(key.clone())], tx).await
	}

	async fn put_batch(&self, ops: &[PutOp], tx: TransactionId) -> Result<()> {
		if ops.is_empty() {
			return Ok(());
		}
		let call = LedgerCall::PutBatch {
			table: self.table.clone(),
			tx,
			len: ops.len(),
		};
		let staged = ops.iter().map(|op| Staged::Put(op.key.clone(), op.value.clone())).collect();
		self.write(call, staged, tx).await
	}

	async fn remove_batch(&self, ops: &[RemoveOp], tx: TransactionId) -> Result<()> {
		if ops.is_empty() {
			return Ok(());
		}
		let call = LedgerCall::RemoveBatch {
			table: self.table.clone(),
			tx,
			len: ops.len(),
		};
		let staged = ops.iter().map(|op| Staged::Remove(op.key.clone())).collect();
		self.write(call, staged, tx).await
	}

	async fn table_scan_to_vec(&self, layout: TableLayout) -> Result<ScanVec> {
		let mut state = self.shared.state.lock();
		state.calls.push(LedgerCall::Scan {
			table: self.table.clone(),
		});
		Ok(state.tables
			.get(&self.table)
			.map(|table| {
				table.rows
					.iter()
					.map(|(key, value)| (key.truncated(layout.key_len), value.truncated(layout.value_len)))
					.collect()
			})
			.unwrap_or_default())
	}

	async fn clear_commit_prepare(&self, tx: TransactionId) -> Result<()> {
		self.shared.delay().await;

		let mut state = self.shared.state.lock();
		state.calls.push(LedgerCall::ClearPrepare {
			table: self.table.clone(),
			tx,
		});
		if let Some(table) = state.tables.get_mut(&self.table) {
			table.staged.remove(&tx);
		}
		Ok(())
	}

	async fn drop_table(&self) -> Result<()> {
		let mut state = self.shared.state.lock();
		state.calls.push(LedgerCall::DropTable {
			table: self.table.clone(),
		});
		state.tables.remove(&self.table);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use ledgerdb_type::{as_key, as_value};

	use super::*;

	#[tokio::test]
	async fn test_direct_writes_apply_immediately() -> Result<()> {
		let ledger = MemoryLedger::new();
		let users = ledger.connector(&TableName::from("users"))?;

		users.put(&as_key!("a"), &as_value!("1"), TransactionId::NONE).await?;
		assert_eq!(users.get(&as_key!("a")).await?, as_value!("1"));

		users.remove(&as_key!("a"), TransactionId::NONE).await?;
		assert!(users.get(&as_key!("a")).await.unwrap_err().is_not_found());
		Ok(())
	}

	#[tokio::test]
	async fn test_staged_writes_wait_for_commit() -> Result<()> {
		let ledger = MemoryLedger::new();
		let users = ledger.connector(&TableName::from("users"))?;
		let tx = TransactionId::generate();

		users.put_batch(&[PutOp::new("users", "a", "1"), PutOp::new("users", "b", "2")], tx).await?;
		assert!(ledger.rows("users").is_empty());
		assert_eq!(ledger.staged("users", tx), 2);

		ledger.atomic_commit(tx, &[users.address().to_string()]).await?;
		assert_eq!(ledger.rows("users").len(), 2);
		assert!(!ledger.has_staged(tx));
		Ok(())
	}

	#[tokio::test]
	async fn test_clear_discards_staged_writes() -> Result<()> {
		let ledger = MemoryLedger::new();
		let users = ledger.connector(&TableName::from("users"))?;
		let tx = TransactionId::generate();

		users.put(&as_key!("a"), &as_value!("1"), tx).await?;
		users.clear_commit_prepare(tx).await?;
		ledger.atomic_commit(tx, &[users.address().to_string()]).await?;

		assert!(ledger.rows("users").is_empty());
		assert_eq!(ledger.cleared(), vec![(TableName::from("users"), tx)]);
		Ok(())
	}

	#[tokio::test]
	async fn test_injected_failures() -> Result<()> {
		let ledger = MemoryLedger::new();
		let users = ledger.connector(&TableName::from("users"))?;
		ledger.fail_prepare("users");

		assert!(users.put(&as_key!("a"), &as_value!("1"), TransactionId::generate()).await.is_err());
		users.put(&as_key!("a"), &as_value!("1"), TransactionId::NONE).await?;

		ledger.fail_commit();
		assert!(ledger.atomic_commit(TransactionId::generate(), &[]).await.is_err());

		ledger.heal();
		ledger.atomic_commit(TransactionId::generate(), &[]).await?;
		assert_eq!(ledger.commits().len(), 2);
		Ok(())
	}

	#[tokio::test]
	async fn test_scan_truncates_to_layout() -> Result<()> {
		let ledger = MemoryLedger::new();
		ledger.insert("users", "key-1", "value-1");
		let users = ledger.connector(&TableName::from("users"))?;

		let rows = users.table_scan_to_vec(TableLayout::new(3, 5)).await?;
		assert_eq!(rows, vec![(as_key!("key"), as_value!("value"))]);
		Ok(())
	}
}
