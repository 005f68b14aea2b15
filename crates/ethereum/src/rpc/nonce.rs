// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	future::Future,
	sync::atomic::{AtomicBool, AtomicU64, Ordering},
};

use ledgerdb_type::Result;
use tokio::sync::OnceCell;

/// Process-wide source of transaction nonces for one sending account.
///
/// The first use loads the account's pending transaction count from the
/// node; afterwards every call hands out the next number, so concurrent
/// senders never share a nonce. After [`NonceSequence::invalidate`] the next
/// call loads the count again, so a nonce the node never accepted is reused.
#[derive(Debug, Default)]
pub struct NonceSequence {
	next: AtomicU64,
	init: OnceCell<()>,
	stale: AtomicBool,
}

impl NonceSequence {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the next nonce, running `load` once to find the starting
	/// point. A failed load is retried by the next caller.
	pub async fn next<F, Fut>(&self, load: F) -> Result<u64>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<u64>>,
	{
		if self.stale.swap(false, Ordering::SeqCst) {
			return match load().await {
				Ok(count) => {
					self.next.store(count, Ordering::SeqCst);
					Ok(self.next.fetch_add(1, Ordering::SeqCst))
				}
				Err(err) => {
					self.stale.store(true, Ordering::SeqCst);
					Err(err)
				}
			};
		}

		self.init
			.get_or_try_init(|| async {
				let count = load().await?;
				self.next.store(count, Ordering::SeqCst);
				Ok::<_, ledgerdb_type::Error>(())
			})
			.await?;
		Ok(self.next.fetch_add(1, Ordering::SeqCst))
	}

	pub fn is_initialized(&self) -> bool {
		self.init.initialized()
	}

	/// Forces a reload of the pending count on the next call.
	pub fn invalidate(&self) {
		if self.init.initialized() {
			self.stale.store(true, Ordering::SeqCst);
		}
	}
}
