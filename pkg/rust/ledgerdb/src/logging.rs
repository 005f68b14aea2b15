// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
	#[default]
	Pretty,
	Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
	/// Filter directives used when `RUST_LOG` is unset, e.g.
	/// `ledgerdb_transaction=debug`.
	pub filter: String,
	pub format: LogFormat,
}

impl Default for TracingConfig {
	fn default() -> Self {
		Self {
			filter: "info".to_string(),
			format: LogFormat::Pretty,
		}
	}
}

impl TracingConfig {
	pub fn new(filter: impl Into<String>) -> Self {
		Self {
			filter: filter.into(),
			..Self::default()
		}
	}

	pub fn json(mut self) -> Self {
		self.format = LogFormat::Json;
		self
	}
}

/// Installs the global subscriber. Keeps an already installed one.
pub(crate) fn init(config: &TracingConfig) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));
	let builder = tracing_subscriber::fmt().with_env_filter(filter);
	let result = match config.format {
		LogFormat::Pretty => builder.try_init(),
		LogFormat::Json => builder.json().try_init(),
	};
	if let Err(err) = result {
		debug!(error = %err, "tracing subscriber already installed");
	}
}
