// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

pub mod bytes;
pub mod error;
pub mod ops;
pub mod transaction;
pub mod util;

pub use bytes::{ByteKey, ByteValue};
pub use error::{Diagnostic, Error, IntoDiagnostic};
pub use ops::{PutOp, RemoveOp, TableLayout, TableName};
pub use transaction::TransactionId;

pub type Result<T> = std::result::Result<T, Error>;
