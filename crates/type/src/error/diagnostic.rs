// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use std::fmt::{Display, Formatter};

use super::Error;

/// User facing rendering of an [`Error`].
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
	pub code: String,
	pub message: String,
	pub help: Option<String>,
	pub notes: Vec<String>,
}

impl Display for Diagnostic {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "[{}] {}", self.code, self.message)?;
		if let Some(help) = &self.help {
			write!(f, "\n  help: {}", help)?;
		}
		for note in &self.notes {
			write!(f, "\n  note: {}", note)?;
		}
		Ok(())
	}
}

pub trait IntoDiagnostic {
	fn into_diagnostic(self) -> Diagnostic;
}

impl IntoDiagnostic for Error {
	fn into_diagnostic(self) -> Diagnostic {
		let code = self.code().to_string();
		let message = self.to_string();

		let (help, notes) = match &self {
			Error::Transport {
				..
			} => (Some("check that the ledger node is reachable at the configured endpoint".to_string()), vec![]),
			Error::Rpc {
				..
			} => (None, vec!["the node answered with a JSON-RPC error object".to_string()]),
			Error::NonceConflict {
				..
			} => (
				None,
				vec!["nonce conflicts are retried internally until the confirmation deadline".to_string()],
			),
			Error::ConfirmationTimeout {
				..
			} => (
				Some("raise the maximum confirmation wait or check that the node is mining".to_string()),
				vec!["the transaction may still be included later; it is not resubmitted".to_string()],
			),
			Error::Reverted {
				..
			} => (Some("inspect the contract state for the affected table".to_string()), vec![]),
			Error::Decode {
				..
			} => (None, vec![]),
			Error::NotFound {
				..
			} => (None, vec![]),
			Error::ValueTooLarge {
				..
			} => (Some("keys and values must fit into one 32 byte word".to_string()), vec![]),
			Error::UnknownTable {
				..
			} => (Some("add the table to the contract address map".to_string()), vec![]),
			Error::Config {
				..
			} => (Some("contract maps use the form table:address,table:address".to_string()), vec![]),
			Error::PrepareFailed {
				..
			} => (
				Some("begin a new transaction and retry the statements".to_string()),
				vec!["prepared state was cleared on every table of the transaction".to_string()],
			),
			Error::AtomicCommitFailed {
				..
			} => (
				None,
				vec![
					"the ledger decides whether any part of the transaction was applied".to_string(),
					"no repair is attempted after a failed commit call".to_string(),
				],
			),
			Error::ScanNotStarted {
				..
			} => (Some("call start_scan before iterating a table".to_string()), vec![]),
			Error::TransactionClosed {
				..
			} => (Some("begin a new transaction".to_string()), vec![]),
		};

		Diagnostic {
			code,
			message,
			help,
			notes,
		}
	}
}
