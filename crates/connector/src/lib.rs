// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Ledger backends behind one capability interface.
//!
//! A [`Ledger`] is the backend technology; it resolves one [`Connector`] per
//! table and finalizes prepared state across tables with
//! [`Ledger::atomic_commit`]. The transaction layer only talks to these two
//! traits and never assumes a backend specific encoding.

mod cache;

use std::sync::Arc;

use async_trait::async_trait;
pub use cache::ConnectorCache;
use indexmap::IndexMap;
use ledgerdb_type::{ByteKey, ByteValue, PutOp, RemoveOp, Result, TableLayout, TableName, TransactionId};

/// Snapshot of a table keyed for lookup, in ledger order.
pub type ScanMap = IndexMap<ByteKey, ByteValue>;

/// Snapshot of a table as plain rows, in ledger order.
pub type ScanVec = Vec<(ByteKey, ByteValue)>;

/// Access to the rows of one table on the ledger.
///
/// Mutating calls take the transaction id they belong to. With
/// [`TransactionId::NONE`] the change is applied right away; with any other
/// id it is staged on the ledger until [`Ledger::atomic_commit`] or
/// [`Connector::clear_commit_prepare`].
#[async_trait]
pub trait Connector: Send + Sync {
	fn table(&self) -> &TableName;

	/// Ledger address of the table; passed to [`Ledger::atomic_commit`].
	fn address(&self) -> &str;

	async fn get(&self, key: &ByteKey) -> Result<ByteValue>;

	async fn put(&self, key: &ByteKey, value: &ByteValue, tx: TransactionId) -> Result<()>;

	async fn remove(&self, key: &ByteKey, tx: TransactionId) -> Result<()>;

	/// Sends many puts in a single ledger call.
	async fn put_batch(&self, ops: &[PutOp], tx: TransactionId) -> Result<()>;

	/// Sends many removes in a single ledger call.
	async fn remove_batch(&self, ops: &[RemoveOp], tx: TransactionId) -> Result<()>;

	async fn table_scan_to_vec(&self, layout: TableLayout) -> Result<ScanVec>;

	async fn table_scan_to_map(&self, layout: TableLayout) -> Result<ScanMap> {
		Ok(self.table_scan_to_vec(layout).await?.into_iter().collect())
	}

	/// Discards everything staged on this table for `tx`.
	async fn clear_commit_prepare(&self, tx: TransactionId) -> Result<()>;

	async fn drop_table(&self) -> Result<()>;
}

#[async_trait]
pub trait Ledger: Send + Sync {
	/// Resolves the connector of `table`. Repeated calls return the same
	/// instance.
	fn connector(&self, table: &TableName) -> Result<Arc<dyn Connector>>;

	/// Finalizes everything staged for `tx` on the given table addresses as
	/// one unit.
	async fn atomic_commit(&self, tx: TransactionId, addresses: &[String]) -> Result<()>;
}
