// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

/// How transactions stage their writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionConfig {
	/// Send every write to the ledger as soon as it is buffered, each on its
	/// own task, instead of batching per table at commit.
	pub prepare_immediately: bool,
	/// Keep a table's scan snapshot for the whole transaction. When off, the
	/// snapshot is reloaded at every scan start and dropped at scan end.
	pub scan_cache: bool,
}

impl Default for TransactionConfig {
	fn default() -> Self {
		Self {
			prepare_immediately: false,
			scan_cache: true,
		}
	}
}

impl TransactionConfig {
	pub fn with_prepare_immediately(mut self, prepare_immediately: bool) -> Self {
		self.prepare_immediately = prepare_immediately;
		self
	}

	pub fn with_scan_cache(mut self, scan_cache: bool) -> Self {
		self.scan_cache = scan_cache;
		self
	}
}
