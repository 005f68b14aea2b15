// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use std::{borrow::Borrow, fmt, ops::Deref, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::bytes::{ByteKey, ByteValue};

/// Name of a table as the engine knows it.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableName(Arc<str>);

impl TableName {
	pub fn new(name: impl AsRef<str>) -> Self {
		Self(Arc::from(name.as_ref()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Deref for TableName {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl Borrow<str> for TableName {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl From<&str> for TableName {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}

impl From<String> for TableName {
	fn from(name: String) -> Self {
		Self(Arc::from(name))
	}
}

impl fmt::Display for TableName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl fmt::Debug for TableName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:?}", &*self.0)
	}
}

/// Intent to write `value` under `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOp {
	pub table: TableName,
	pub key: ByteKey,
	pub value: ByteValue,
}

impl PutOp {
	pub fn new(table: impl Into<TableName>, key: impl Into<ByteKey>, value: impl Into<ByteValue>) -> Self {
		Self {
			table: table.into(),
			key: key.into(),
			value: value.into(),
		}
	}
}

/// Intent to delete the row stored under `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOp {
	pub table: TableName,
	pub key: ByteKey,
}

impl RemoveOp {
	pub fn new(table: impl Into<TableName>, key: impl Into<ByteKey>) -> Self {
		Self {
			table: table.into(),
			key: key.into(),
		}
	}
}

/// Fixed widths of a table's key and value columns.
///
/// Ledger backends pad keys and values to their native word size; scans use
/// the layout to cut them back to the row widths the engine expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLayout {
	pub key_len: usize,
	pub value_len: usize,
}

impl TableLayout {
	pub fn new(key_len: usize, value_len: usize) -> Self {
		Self {
			key_len,
			value_len,
		}
	}
}
