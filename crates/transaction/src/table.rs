// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	collections::{HashMap, VecDeque},
	future::Future,
	sync::Arc,
};

use indexmap::IndexMap;
use ledgerdb_connector::{Connector, ScanMap};
use ledgerdb_type::{ByteKey, ByteValue, PutOp, RemoveOp, Result, TableName, TransactionId};
use parking_lot::Mutex;
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::{error, trace, warn};

/// Writes of one transaction to one table, plus the table's read cache.
///
/// Each key is held by at most one buffered operation: a put retracts an
/// earlier put or remove of the same key, a remove retracts an earlier put.
/// Replaying all puts and then all removes therefore ends in the same state
/// as replaying the calls in order.
///
/// With `prepare_immediately` every write is sent by its own worker. Workers
/// on different keys may reach the ledger in any order; a worker waits for
/// the previous worker on the same key before it sends.
pub struct TableTransaction {
	table: TableName,
	tx: TransactionId,
	connector: Arc<dyn Connector>,

	puts: IndexMap<ByteKey, PutOp>,
	removes: IndexMap<ByteKey, RemoveOp>,
	/// Removes held back while a scan walks `scan_cache`.
	pending_removes: VecDeque<RemoveOp>,
	scan_cache: ScanMap,

	cache_filled: bool,
	defer_removes: bool,
	prepare_immediately: bool,
	writes: usize,

	prepare_success: Arc<Mutex<bool>>,
	workers: Vec<JoinHandle<()>>,
	/// Completion signal of the latest worker per key.
	last_worker: HashMap<ByteKey, oneshot::Receiver<()>>,
}

impl TableTransaction {
	pub fn new(connector: Arc<dyn Connector>, tx: TransactionId, prepare_immediately: bool) -> Self {
		Self {
			table: connector.table().clone(),
			tx,
			connector,
			puts: IndexMap::new(),
			removes: IndexMap::new(),
			pending_removes: VecDeque::new(),
			scan_cache: ScanMap::new(),
			cache_filled: false,
			defer_removes: false,
			prepare_immediately,
			writes: 0,
			prepare_success: Arc::new(Mutex::new(true)),
			workers: Vec::new(),
			last_worker: HashMap::new(),
		}
	}

	pub fn table(&self) -> &TableName {
		&self.table
	}

	pub fn tx(&self) -> TransactionId {
		self.tx
	}

	pub fn connector(&self) -> &Arc<dyn Connector> {
		&self.connector
	}

	pub fn prepare_immediately(&self) -> bool {
		self.prepare_immediately
	}

	/// Buffers `op` and makes it visible to later reads.
	pub fn add_put(&mut self, op: PutOp) {
		self.writes += 1;
		self.scan_cache.insert(op.key.clone(), op.value.clone());
		self.removes.shift_remove(&op.key);
		self.puts.shift_remove(&op.key);

		if self.prepare_immediately {
			let connector = Arc::clone(&self.connector);
			let (key, value, tx) = (op.key.clone(), op.value.clone(), self.tx);
			self.dispatch("put", &op.key, async move { connector.put(&key, &value, tx).await });
		}
		self.puts.insert(op.key.clone(), op);
	}

	/// Buffers `op`. A deferred remove issued during a scan waits in the
	/// pending queue until the scan ends.
	pub fn add_remove(&mut self, op: RemoveOp, deferred: bool) {
		if deferred && self.defer_removes {
			trace!(table = %self.table, key = ?op.key, "remove deferred until scan end");
			self.pending_removes.push_back(op);
			return;
		}

		self.writes += 1;
		self.scan_cache.shift_remove(&op.key);
		self.puts.shift_remove(&op.key);
		self.removes.shift_remove(&op.key);

		if self.prepare_immediately {
			let connector = Arc::clone(&self.connector);
			let (key, tx) = (op.key.clone(), self.tx);
			self.dispatch("remove", &op.key, async move { connector.remove(&key, tx).await });
		}
		self.removes.insert(op.key.clone(), op);
	}

	pub fn drain_pending_removes(&mut self) {
		while let Some(op) = self.pending_removes.pop_front() {
			self.add_remove(op, false);
		}
	}

	pub fn pending_removes(&self) -> usize {
		self.pending_removes.len()
	}

	/// Replays the buffered operations onto the cache.
	pub fn reapply_buffered_ops(&mut self) {
		for op in self.puts.values() {
			self.scan_cache.insert(op.key.clone(), op.value.clone());
		}
		for key in self.removes.keys() {
			self.scan_cache.shift_remove(key);
		}
	}

	/// Installs a ledger snapshot as the cache, with this transaction's own
	/// writes applied on top.
	pub fn load_cache(&mut self, entries: ScanMap) {
		self.scan_cache = entries;
		self.reapply_buffered_ops();
		self.cache_filled = true;
	}

	pub fn clear_cache(&mut self) {
		self.scan_cache.clear();
		self.cache_filled = false;
	}

	pub fn is_cache_filled(&self) -> bool {
		self.cache_filled
	}

	pub fn begin_scan(&mut self) {
		self.defer_removes = true;
	}

	/// Leaves scan mode and applies every remove held back meanwhile.
	pub fn end_scan(&mut self) {
		self.defer_removes = false;
		self.drain_pending_removes();
	}

	pub fn is_scanning(&self) -> bool {
		self.defer_removes
	}

	pub fn scan_entry(&self, position: usize) -> Option<(&ByteKey, &ByteValue)> {
		self.scan_cache.get_index(position)
	}

	pub fn scan_len(&self) -> usize {
		self.scan_cache.len()
	}

	pub fn cached(&self, key: &ByteKey) -> Option<&ByteValue> {
		self.scan_cache.get(key)
	}

	/// This transaction's own write to `key`: `Some(None)` for a remove,
	/// `None` if the key was not written.
	pub fn buffered(&self, key: &ByteKey) -> Option<Option<&ByteValue>> {
		if let Some(op) = self.puts.get(key) {
			return Some(Some(&op.value));
		}
		self.removes.get(key).map(|_| None)
	}

	pub fn is_read_only(&self) -> bool {
		self.writes == 0
	}

	pub fn put_ops(&self) -> Vec<PutOp> {
		self.puts.values().cloned().collect()
	}

	pub fn remove_ops(&self) -> Vec<RemoveOp> {
		self.removes.values().cloned().collect()
	}

	/// Waits for every dispatched prepare worker. Returns false if any of
	/// them failed or panicked.
	pub async fn wait_for_prepare_workers(&mut self) -> bool {
		self.last_worker.clear();
		for worker in self.workers.drain(..) {
			if let Err(err) = worker.await {
				error!(table = %self.table, tx = %self.tx, error = %err, "prepare worker aborted");
				*self.prepare_success.lock() = false;
			}
		}
		*self.prepare_success.lock()
	}

	/// Joins outstanding workers and releases the buffer.
	pub async fn dispose(mut self) {
		self.wait_for_prepare_workers().await;
	}

	fn dispatch<F>(&mut self, kind: &'static str, key: &ByteKey, work: F)
	where
		F: Future<Output = Result<()>> + Send + 'static,
	{
		let success = Arc::clone(&self.prepare_success);
		let table = self.table.clone();
		let (done, finished) = oneshot::channel::<()>();
		let previous = self.last_worker.insert(key.clone(), finished);
		self.workers.push(tokio::spawn(async move {
			let _done = done;
			if let Some(previous) = previous {
				// resolves once the previous worker ends, also on failure
				let _ = previous.await;
			}
			if let Err(err) = work.await {
				warn!(%table, kind, error = %err, "prepare worker failed");
				*success.lock() = false;
			}
		}));
	}
}

impl Drop for TableTransaction {
	fn drop(&mut self) {
		if !self.workers.is_empty() {
			error!(
				table = %self.table,
				tx = %self.tx,
				workers = self.workers.len(),
				"table transaction dropped with prepare workers still running"
			);
		}
	}
}
