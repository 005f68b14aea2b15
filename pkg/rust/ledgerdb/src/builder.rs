// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Arc;

use ledgerdb_connector::Ledger;
use ledgerdb_ethereum::{Ethereum, EthereumConfig};
use ledgerdb_transaction::TransactionConfig;
use ledgerdb_type::Result;
use tracing::debug;

use crate::{
	LedgerDb,
	logging::{self, TracingConfig},
};

pub struct LedgerDbBuilder {
	ledger: Arc<dyn Ledger>,
	config: TransactionConfig,
	tracing: Option<TracingConfig>,
}

impl LedgerDbBuilder {
	pub fn new(ledger: Arc<dyn Ledger>) -> Self {
		Self {
			ledger,
			config: TransactionConfig::default(),
			tracing: None,
		}
	}

	/// Ethereum ledger reached over HTTP JSON-RPC.
	pub fn ethereum(config: EthereumConfig) -> Result<Self> {
		Ok(Self::new(Arc::new(Ethereum::new(config)?)))
	}

	pub fn with_transaction_config(mut self, config: TransactionConfig) -> Self {
		self.config = config;
		self
	}

	pub fn with_prepare_immediately(mut self, prepare_immediately: bool) -> Self {
		self.config.prepare_immediately = prepare_immediately;
		self
	}

	pub fn with_scan_cache(mut self, scan_cache: bool) -> Self {
		self.config.scan_cache = scan_cache;
		self
	}

	/// Installs a global tracing subscriber when the store is built.
	pub fn with_tracing(mut self, tracing: TracingConfig) -> Self {
		self.tracing = Some(tracing);
		self
	}

	pub fn build(self) -> LedgerDb {
		if let Some(tracing) = &self.tracing {
			logging::init(tracing);
		}
		debug!(
			prepare_immediately = self.config.prepare_immediately,
			scan_cache = self.config.scan_cache,
			"ledgerdb ready"
		);
		LedgerDb {
			ledger: self.ledger,
			config: self.config,
		}
	}
}
