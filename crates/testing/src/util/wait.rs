// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Waiting for background prepare workers in tests.

use std::time::Duration;

use tokio::time::{sleep, timeout};

const LIMIT: Duration = Duration::from_secs(5);

const TICK: Duration = Duration::from_millis(1);

/// Resolves once `condition` holds; panics with `message` after five seconds.
pub async fn wait_for<F>(condition: F, message: &str)
where
	F: Fn() -> bool,
{
	let polled = timeout(LIMIT, async {
		while !condition() {
			sleep(TICK).await;
		}
	})
	.await;
	if polled.is_err() {
		panic!("condition not met within {:?}: {}", LIMIT, message);
	}
}
