// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

mod diagnostic;

use std::time::Duration;

pub use diagnostic::{Diagnostic, IntoDiagnostic};

use crate::{ByteKey, TableName, TransactionId};

/// Every failure the ledger stack reports.
///
/// Ledger-level variants come from connectors and the RPC client, the
/// transaction variants from the commit coordinator and the session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
	#[error("ledger transport failed: {reason}")]
	Transport {
		reason: String,
	},

	#[error("ledger rejected request ({code}): {message}")]
	Rpc {
		code: i64,
		message: String,
	},

	#[error("nonce {nonce} rejected: {message}")]
	NonceConflict {
		nonce: u64,
		message: String,
	},

	#[error("transaction {tx_hash} not mined within {waited:?}")]
	ConfirmationTimeout {
		tx_hash: String,
		waited: Duration,
	},

	#[error("transaction {tx_hash} was mined but reverted")]
	Reverted {
		tx_hash: String,
	},

	#[error("malformed ledger response: {reason}")]
	Decode {
		reason: String,
	},

	#[error("key {key:?} not found in table {table}")]
	NotFound {
		table: TableName,
		key: ByteKey,
	},

	#[error("{len} bytes do not fit into a {max} byte ledger word")]
	ValueTooLarge {
		len: usize,
		max: usize,
	},

	#[error("no ledger contract configured for table {table}")]
	UnknownTable {
		table: TableName,
	},

	#[error("invalid ledger configuration: {reason}")]
	Config {
		reason: String,
	},

	#[error("prepare of table {table} failed for transaction {tx}")]
	PrepareFailed {
		table: TableName,
		tx: TransactionId,
	},

	#[error("atomic commit of transaction {tx} failed: {reason}")]
	AtomicCommitFailed {
		tx: TransactionId,
		reason: String,
	},

	#[error("no scan in progress on table {table}")]
	ScanNotStarted {
		table: TableName,
	},

	#[error("transaction {tx} is already {state}")]
	TransactionClosed {
		tx: TransactionId,
		state: &'static str,
	},
}

impl Error {
	/// Only sequence-number races are worth resubmitting.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Error::NonceConflict { .. })
	}

	pub fn is_not_found(&self) -> bool {
		matches!(self, Error::NotFound { .. })
	}

	pub fn code(&self) -> &'static str {
		match self {
			Error::Transport {
				..
			} => "LEDGER_001",
			Error::Rpc {
				..
			} => "LEDGER_002",
			Error::NonceConflict {
				..
			} => "LEDGER_003",
			Error::ConfirmationTimeout {
				..
			} => "LEDGER_004",
			Error::Reverted {
				..
			} => "LEDGER_005",
			Error::Decode {
				..
			} => "LEDGER_006",
			Error::NotFound {
				..
			} => "LEDGER_007",
			Error::ValueTooLarge {
				..
			} => "LEDGER_008",
			Error::UnknownTable {
				..
			} => "LEDGER_009",
			Error::Config {
				..
			} => "LEDGER_010",
			Error::PrepareFailed {
				..
			} => "TXN_001",
			Error::AtomicCommitFailed {
				..
			} => "TXN_002",
			Error::ScanNotStarted {
				..
			} => "TXN_003",
			Error::TransactionClosed {
				..
			} => "TXN_004",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_only_nonce_conflict_is_retryable() {
		let conflict = Error::NonceConflict {
			nonce: 7,
			message: "nonce too low".to_string(),
		};
		assert!(conflict.is_retryable());

		let timeout = Error::ConfirmationTimeout {
			tx_hash: "0xabc".to_string(),
			waited: Duration::from_secs(1),
		};
		assert!(!timeout.is_retryable());
	}

	#[test]
	fn test_codes_are_stable() {
		let err = Error::UnknownTable {
			table: TableName::from("users"),
		};
		assert_eq!(err.code(), "LEDGER_009");
		assert_eq!(err.to_string(), "no ledger contract configured for table users");
	}
}
