// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Transactions over ledger backed tables.
//!
//! A [`Session`] routes engine level reads and writes either straight to the
//! ledger or, inside a transaction, into one [`TableTransaction`] buffer per
//! table. [`Transaction::commit`] prepares every buffer on the ledger and
//! finalizes them with a single atomic commit.

mod config;
mod coordinator;
mod session;
mod table;

pub use config::TransactionConfig;
pub use coordinator::{Transaction, TransactionState};
pub use session::Session;
pub use table::TableTransaction;
