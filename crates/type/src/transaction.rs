// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use std::fmt::{Display, Formatter};

use uuid::Uuid;

use crate::{Error, Result};

/// Identifier shared by every table buffer of one logical transaction.
///
/// The all-zero id is reserved: operations carrying it bypass staging and
/// are applied to the ledger directly.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct TransactionId([u8; 16]);

impl TransactionId {
	pub const NONE: TransactionId = TransactionId([0u8; 16]);

	/// Mints a fresh time-ordered id. Never returns [`TransactionId::NONE`].
	pub fn generate() -> Self {
		Self(*Uuid::now_v7().as_bytes())
	}

	pub const fn from_bytes(bytes: [u8; 16]) -> Self {
		Self(bytes)
	}

	#[inline]
	pub fn as_bytes(&self) -> &[u8; 16] {
		&self.0
	}

	#[inline]
	pub fn is_none(&self) -> bool {
		self.0 == [0u8; 16]
	}
}

impl Default for TransactionId {
	fn default() -> Self {
		Self::NONE
	}
}

impl TryFrom<&[u8]> for TransactionId {
	type Error = Error;

	fn try_from(bytes: &[u8]) -> Result<Self> {
		let bytes: [u8; 16] = bytes.try_into().map_err(|_| Error::Decode {
			reason: format!("invalid transaction id length: expected 16 bytes, got {}", bytes.len()),
		})?;
		Ok(Self(bytes))
	}
}

impl Display for TransactionId {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", Uuid::from_bytes(self.0))
	}
}
