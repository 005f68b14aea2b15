// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Arc;

use dashmap::DashMap;
use ledgerdb_type::{Result, TableName};

use crate::Connector;

/// Connectors resolved so far, one per table.
#[derive(Default)]
pub struct ConnectorCache {
	connectors: DashMap<TableName, Arc<dyn Connector>>,
}

impl ConnectorCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the cached connector of `table`, creating it with `create` on
	/// first use. When two callers race, the first inserted instance wins.
	pub fn get_or_try_insert<F>(&self, table: &TableName, create: F) -> Result<Arc<dyn Connector>>
	where
		F: FnOnce() -> Result<Arc<dyn Connector>>,
	{
		if let Some(connector) = self.connectors.get(table) {
			return Ok(Arc::clone(connector.value()));
		}

		let created = create()?;
		let connector = self.connectors.entry(table.clone()).or_insert(created);
		Ok(Arc::clone(connector.value()))
	}

	pub fn len(&self) -> usize {
		self.connectors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.connectors.is_empty()
	}
}
