// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

//! Lower-case hex encoding as used on the JSON-RPC wire.

use std::fmt;

const ALPHABET: &[u8; 16] = b"0123456789abcdef";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
	OddLength(usize),
	InvalidCharacter {
		character: char,
		index: usize,
	},
}

impl fmt::Display for DecodeError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DecodeError::OddLength(len) => write!(f, "odd number of hex digits: {}", len),
			DecodeError::InvalidCharacter {
				character,
				index,
			} => write!(f, "invalid hex character {:?} at {}", character, index),
		}
	}
}

impl std::error::Error for DecodeError {}

pub fn encode(bytes: impl AsRef<[u8]>) -> String {
	let bytes = bytes.as_ref();
	let mut out = String::with_capacity(bytes.len() * 2);
	for byte in bytes {
		out.push(ALPHABET[(byte >> 4) as usize] as char);
		out.push(ALPHABET[(byte & 0x0f) as usize] as char);
	}
	out
}

/// Decodes hex digits, accepting an optional `0x` prefix.
pub fn decode(text: impl AsRef<str>) -> Result<Vec<u8>, DecodeError> {
	let text = strip_prefix(text.as_ref());
	let digits = text.as_bytes();
	if digits.len() % 2 != 0 {
		return Err(DecodeError::OddLength(digits.len()));
	}

	let mut out = Vec::with_capacity(digits.len() / 2);
	for (index, pair) in digits.chunks_exact(2).enumerate() {
		let high = nibble(pair[0], index * 2)?;
		let low = nibble(pair[1], index * 2 + 1)?;
		out.push((high << 4) | low);
	}
	Ok(out)
}

pub fn strip_prefix(text: &str) -> &str {
	text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")).unwrap_or(text)
}

fn nibble(digit: u8, index: usize) -> Result<u8, DecodeError> {
	match digit {
		b'0'..=b'9' => Ok(digit - b'0'),
		b'a'..=b'f' => Ok(digit - b'a' + 10),
		b'A'..=b'F' => Ok(digit - b'A' + 10),
		_ => Err(DecodeError::InvalidCharacter {
			character: digit as char,
			index,
		}),
	}
}
