// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! LedgerDB keeps the rows of relational tables on an append-only ledger
//! while giving the engine above buffered writes, stable scans and atomic
//! commits across tables.
//!
//! ```no_run
//! use ledgerdb::{EthereumConfig, LedgerDbBuilder, TableLayout, TableName, as_key, as_value};
//!
//! # async fn run() -> ledgerdb::Result<()> {
//! let config = EthereumConfig::new("http://127.0.0.1:8545", "0x00000000000000000000000000000000000000f0")
//! 	.with_commit_contract("0x00000000000000000000000000000000000000c0")
//! 	.with_contract("users", "0x00000000000000000000000000000000000000a1");
//! let db = LedgerDbBuilder::ethereum(config)?.build();
//!
//! let mut session = db.session();
//! let users = TableName::from("users");
//! session.begin_or_join_transaction();
//! session.put(&users, as_key!("k1"), as_value!("alice")).await?;
//! session.commit().await?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod logging;

use std::sync::Arc;

pub use builder::LedgerDbBuilder;
pub use ledgerdb_connector::{Connector, ConnectorCache, Ledger, ScanMap, ScanVec};
pub use ledgerdb_ethereum::{Ethereum, EthereumConfig};
pub use ledgerdb_transaction::{Session, TableTransaction, Transaction, TransactionConfig, TransactionState};
pub use ledgerdb_type::{
	ByteKey, ByteValue, Diagnostic, Error, IntoDiagnostic, PutOp, RemoveOp, Result, TableLayout, TableName,
	TransactionId, as_key, as_value,
};
pub use logging::{LogFormat, TracingConfig};

/// A ledger together with the transaction settings its sessions use.
#[derive(Clone)]
pub struct LedgerDb {
	ledger: Arc<dyn Ledger>,
	config: TransactionConfig,
}

impl LedgerDb {
	pub fn ledger(&self) -> &Arc<dyn Ledger> {
		&self.ledger
	}

	pub fn config(&self) -> &TransactionConfig {
		&self.config
	}

	/// Opens a session in autocommit mode. Sessions share the ledger and its
	/// connectors.
	pub fn session(&self) -> Session {
		Session::new(Arc::clone(&self.ledger), self.config)
	}
}
