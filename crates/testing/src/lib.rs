// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

pub mod memory;
pub mod util;

pub use memory::{LedgerCall, MemoryConnector, MemoryLedger};
