// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Calldata encoding for the table and commit contracts.
//!
//! Every argument occupies one 32 byte word. Keys, values and transaction ids
//! are left aligned (`bytesN`), counts and addresses right aligned. Batch
//! calls follow the regular ABI layout of a trailing `bytes32[]`:
//!
//! ```text
//! selector | [tx id] | offset | len | key_0 .. key_n | value_0 .. value_n
//! ```
//!
//! The tx id word is present only for staged (`prepare*`) calls, values only
//! for puts. A put batch of n rows announces an array of 2n words.

use ledgerdb_connector::ScanVec;
use ledgerdb_type::{ByteKey, ByteValue, Error, PutOp, RemoveOp, Result, TableLayout, TransactionId, util::hex};

pub const WORD: usize = 32;

pub type Word = [u8; WORD];

pub type Selector = [u8; 4];

/// `keccak256(signature)[..4]` of every contract entry point.
pub mod selector {
	use super::Selector;

	/// `get(bytes32)`
	pub const GET: Selector = [0x8e, 0xaa, 0x6a, 0xc0];
	/// `put(bytes32,bytes32)`
	pub const PUT: Selector = [0x4c, 0x66, 0x70, 0x80];
	/// `preparePut(bytes16,bytes32,bytes32)`
	pub const PREPARE_PUT: Selector = [0x0d, 0xbb, 0x52, 0x9f];
	/// `remove(bytes32)`
	pub const REMOVE: Selector = [0x95, 0xbc, 0x26, 0x73];
	/// `prepareRemove(bytes16,bytes32)`
	pub const PREPARE_REMOVE: Selector = [0x41, 0x13, 0x17, 0x85];
	/// `putBatch(bytes32[])`
	pub const PUT_BATCH: Selector = [0xf8, 0xc7, 0x04, 0xa6];
	/// `preparePutBatch(bytes16,bytes32[])`
	pub const PREPARE_PUT_BATCH: Selector = [0x9b, 0xc9, 0x91, 0xc7];
	/// `removeBatch(bytes32[])`
	pub const REMOVE_BATCH: Selector = [0x2d, 0x9b, 0xb7, 0x56];
	/// `prepareRemoveBatch(bytes16,bytes32[])`
	pub const PREPARE_REMOVE_BATCH: Selector = [0xdb, 0x71, 0x0d, 0x49];
	/// `tableScan()`
	pub const TABLE_SCAN: Selector = [0xb3, 0x05, 0x5e, 0x26];
	/// `clearPrepare(bytes16)`
	pub const CLEAR_PREPARE: Selector = [0x0a, 0xeb, 0x0c, 0xe5];
	/// `dropTable()`
	pub const DROP_TABLE: Selector = [0x7c, 0x50, 0x56, 0x87];
	/// `commitAll(bytes16,address[])`
	pub const COMMIT_ALL: Selector = [0x33, 0x4c, 0x11, 0x76];
}

/// Calldata under construction.
struct Calldata {
	bytes: Vec<u8>,
}

impl Calldata {
	fn new(selector: Selector, words: usize) -> Self {
		let mut bytes = Vec::with_capacity(4 + words * WORD);
		bytes.extend_from_slice(&selector);
		Self {
			bytes,
		}
	}

	fn push(&mut self, word: Word) -> &mut Self {
		self.bytes.extend_from_slice(&word);
		self
	}

	fn into_hex(self) -> String {
		format!("0x{}", hex::encode(&self.bytes))
	}
}

pub fn uint_word(value: u64) -> Word {
	let mut word = [0u8; WORD];
	word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
	word
}

/// Left aligned, zero padded word; fails for more than 32 bytes.
pub fn bytes_word(bytes: &[u8]) -> Result<Word> {
	if bytes.len() > WORD {
		return Err(Error::ValueTooLarge {
			len: bytes.len(),
			max: WORD,
		});
	}
	let mut word = [0u8; WORD];
	word[..bytes.len()].copy_from_slice(bytes);
	Ok(word)
}

pub fn tx_word(tx: TransactionId) -> Word {
	let mut word = [0u8; WORD];
	word[..16].copy_from_slice(tx.as_bytes());
	word
}

/// Right aligned address word; `0x` prefix and letter case are ignored.
pub fn address_word(address: &str) -> Result<Word> {
	let bytes = hex::decode(address.to_ascii_lowercase()).map_err(|err| Error::Config {
		reason: format!("invalid contract address '{}': {}", address, err),
	})?;
	if bytes.len() > WORD {
		return Err(Error::Config {
			reason: format!("contract address '{}' is longer than one word", address),
		});
	}
	let mut word = [0u8; WORD];
	word[WORD - bytes.len()..].copy_from_slice(&bytes);
	Ok(word)
}

pub fn encode_get(key: &ByteKey) -> Result<String> {
	let mut data = Calldata::new(selector::GET, 1);
	data.push(bytes_word(key)?);
	Ok(data.into_hex())
}

/// Decodes the `(bool found, bytes32 value)` answer of `get`.
pub fn decode_get(response: &str) -> Result<Option<ByteValue>> {
	let words = split_words(response)?;
	if words.len() < 2 {
		return Err(Error::Decode {
			reason: format!("get returned {} words, expected 2", words.len()),
		});
	}
	if words[0].iter().all(|byte| *byte == 0) {
		return Ok(None);
	}
	Ok(Some(ByteValue::new(words[1])))
}

pub fn encode_put(key: &ByteKey, value: &ByteValue, tx: TransactionId) -> Result<String> {
	let mut data = if tx.is_none() {
		Calldata::new(selector::PUT, 2)
	} else {
		let mut data = Calldata::new(selector::PREPARE_PUT, 3);
		data.push(tx_word(tx));
		data
	};
	data.push(bytes_word(key)?).push(bytes_word(value)?);
	Ok(data.into_hex())
}

pub fn encode_remove(key: &ByteKey, tx: TransactionId) -> Result<String> {
	let mut data = if tx.is_none() {
		Calldata::new(selector::REMOVE, 1)
	} else {
		let mut data = Calldata::new(selector::PREPARE_REMOVE, 2);
		data.push(tx_word(tx));
		data
	};
	data.push(bytes_word(key)?);
	Ok(data.into_hex())
}

pub fn encode_put_batch(ops: &[PutOp], tx: TransactionId) -> Result<String> {
	let mut elements = Vec::with_capacity(ops.len() * 2);
	for op in ops {
		elements.push(bytes_word(&op.key)?);
	}
	for op in ops {
		elements.push(bytes_word(&op.value)?);
	}
	Ok(encode_batch(selector::PUT_BATCH, selector::PREPARE_PUT_BATCH, tx, elements))
}

pub fn encode_remove_batch(ops: &[RemoveOp], tx: TransactionId) -> Result<String> {
	let elements = ops.iter().map(|op| bytes_word(&op.key)).collect::<Result<Vec<_>>>()?;
	Ok(encode_batch(selector::REMOVE_BATCH, selector::PREPARE_REMOVE_BATCH, tx, elements))
}

/// Head words first, then the `bytes32[]` tail: length word and elements.
fn encode_batch(direct: Selector, staged: Selector, tx: TransactionId, elements: Vec<Word>) -> String {
	let (selector, head_words) = if tx.is_none() {
		(direct, 1)
	} else {
		(staged, 2)
	};
	let mut data = Calldata::new(selector, head_words + 1 + elements.len());
	if !tx.is_none() {
		data.push(tx_word(tx));
	}
	data.push(uint_word((head_words * WORD) as u64)).push(uint_word(elements.len() as u64));
	for element in elements {
		data.push(element);
	}
	data.into_hex()
}

/// A batch call taken apart again; keys and values are full words.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBatch {
	pub tx: TransactionId,
	pub keys: Vec<ByteKey>,
	pub values: Vec<ByteValue>,
}

pub fn decode_put_batch(calldata: &str) -> Result<DecodedBatch> {
	decode_batch(calldata, selector::PUT_BATCH, selector::PREPARE_PUT_BATCH, true)
}

pub fn decode_remove_batch(calldata: &str) -> Result<DecodedBatch> {
	decode_batch(calldata, selector::REMOVE_BATCH, selector::PREPARE_REMOVE_BATCH, false)
}

fn decode_batch(calldata: &str, direct: Selector, staged: Selector, with_values: bool) -> Result<DecodedBatch> {
	let bytes = decode_hex(calldata)?;
	if bytes.len() < 4 {
		return Err(Error::Decode {
			reason: "calldata shorter than a selector".to_string(),
		});
	}
	let (head, body) = bytes.split_at(4);
	let staged_call = if head == direct {
		false
	} else if head == staged {
		true
	} else {
		return Err(Error::Decode {
			reason: format!("unexpected selector 0x{}", hex::encode(head)),
		});
	};

	let words = words_of(body)?;
	let (tx, offset_at) = if staged_call {
		let word = word_at(&words, 0)?;
		(TransactionId::try_from(&word[..16])?, 1)
	} else {
		(TransactionId::NONE, 0)
	};

	let offset = word_at(&words, offset_at).and_then(word_to_count)?;
	if offset % WORD != 0 || offset / WORD != offset_at + 1 {
		return Err(Error::Decode {
			reason: format!("unexpected array offset {}", offset),
		});
	}

	let len_at = offset_at + 1;
	let len = word_at(&words, len_at).and_then(word_to_count)?;
	let elements = &words[len_at + 1..];
	if len != elements.len() {
		return Err(Error::Decode {
			reason: format!("batch announces {} words but carries {}", len, elements.len()),
		});
	}

	let (keys, values) = if with_values {
		if len % 2 != 0 {
			return Err(Error::Decode {
				reason: format!("put batch carries an odd number of words ({})", len),
			});
		}
		elements.split_at(len / 2)
	} else {
		(elements, &elements[len..])
	};

	Ok(DecodedBatch {
		tx,
		keys: keys.iter().map(ByteKey::new).collect(),
		values: values.iter().map(ByteValue::new).collect(),
	})
}

pub fn encode_table_scan() -> String {
	Calldata::new(selector::TABLE_SCAN, 0).into_hex()
}

/// Decodes the `(bytes32[] keys, bytes32[] values)` answer of `tableScan`.
///
/// Word 2 holds the number of entries, followed by the keys, the length word
/// of the value array and the values.
pub fn decode_table_scan(response: &str, layout: TableLayout) -> Result<ScanVec> {
	let words = split_words(response)?;
	let count = word_at(&words, 2).and_then(word_to_count)?;
	if count > words.len() {
		return Err(Error::Decode {
			reason: format!("table scan announces {} entries in {} words", count, words.len()),
		});
	}

	let values_len_at = 3 + count;
	let values_len = word_at(&words, values_len_at).and_then(word_to_count)?;
	if values_len != count {
		return Err(Error::Decode {
			reason: format!("table scan returned {} keys but {} values", count, values_len),
		});
	}

	let mut rows = Vec::with_capacity(count);
	for i in 0..count {
		let key = word_at(&words, 3 + i)?;
		let value = word_at(&words, values_len_at + 1 + i)?;
		rows.push((ByteKey::new(&key[..layout.key_len.min(WORD)]), ByteValue::new(&value[..layout.value_len.min(WORD)])));
	}
	Ok(rows)
}

pub fn encode_clear_prepare(tx: TransactionId) -> String {
	let mut data = Calldata::new(selector::CLEAR_PREPARE, 1);
	data.push(tx_word(tx));
	data.into_hex()
}

pub fn encode_drop_table() -> String {
	Calldata::new(selector::DROP_TABLE, 0).into_hex()
}

/// `commitAll(bytes16 tx, address[] tables)`.
pub fn encode_commit_all(tx: TransactionId, addresses: &[String]) -> Result<String> {
	let mut data = Calldata::new(selector::COMMIT_ALL, 3 + addresses.len());
	data.push(tx_word(tx)).push(uint_word(0x40)).push(uint_word(addresses.len() as u64));
	for address in addresses {
		data.push(address_word(address)?);
	}
	Ok(data.into_hex())
}

fn decode_hex(text: &str) -> Result<Vec<u8>> {
	hex::decode(text).map_err(|err| Error::Decode {
		reason: err.to_string(),
	})
}

/// Splits a hex payload into 32 byte words.
pub fn split_words(response: &str) -> Result<Vec<Word>> {
	words_of(&decode_hex(response)?)
}

fn words_of(bytes: &[u8]) -> Result<Vec<Word>> {
	if bytes.len() % WORD != 0 {
		return Err(Error::Decode {
			reason: format!("payload of {} bytes is not a multiple of {}", bytes.len(), WORD),
		});
	}
	Ok(bytes
		.chunks_exact(WORD)
		.map(|chunk| {
			let mut word = [0u8; WORD];
			word.copy_from_slice(chunk);
			word
		})
		.collect())
}

fn word_at(words: &[Word], index: usize) -> Result<Word> {
	words.get(index).copied().ok_or_else(|| Error::Decode {
		reason: format!("payload ends before word {}", index),
	})
}

fn word_to_count(word: Word) -> Result<usize> {
	if word[..WORD - 8].iter().any(|byte| *byte != 0) {
		return Err(Error::Decode {
			reason: "count does not fit into 64 bits".to_string(),
		});
	}
	let mut bytes = [0u8; 8];
	bytes.copy_from_slice(&word[WORD - 8..]);
	usize::try_from(u64::from_be_bytes(bytes)).map_err(|_| Error::Decode {
		reason: "count does not fit into usize".to_string(),
	})
}

#[cfg(test)]
mod tests {
	use ledgerdb_type::{as_key, as_value};

	use super::*;

	fn word_hex(word: Word) -> String {
		hex::encode(word)
	}

	fn scan_response(rows: &[(&str, &str)]) -> String {
		let mut words = vec![uint_word(0x40), uint_word(0x40 + 32 * (rows.len() as u64 + 1)), uint_word(rows.len() as u64)];
		for (key, _) in rows {
			words.push(bytes_word(key.as_bytes()).unwrap());
		}
		words.push(uint_word(rows.len() as u64));
		for (_, value) in rows {
			words.push(bytes_word(value.as_bytes()).unwrap());
		}
		format!("0x{}", words.into_iter().map(word_hex).collect::<String>())
	}

	#[test]
	fn test_direct_put_layout() {
		let data = encode_put(&as_key!("k"), &as_value!("v"), TransactionId::NONE).unwrap();
		assert!(data.starts_with("0x4c667080"));
		assert_eq!(data.len(), 2 + 8 + 2 * 64);
		assert_eq!(&data[10..12], "6b");
		assert_eq!(&data[74..76], "76");
	}

	#[test]
	fn test_staged_put_carries_tx_id() {
		let tx = TransactionId::from_bytes([0xab; 16]);
		let data = encode_put(&as_key!("k"), &as_value!("v"), tx).unwrap();
		assert!(data.starts_with("0x0dbb529f"));
		assert_eq!(&data[10..42], "ab".repeat(16));
		assert_eq!(&data[42..74], "0".repeat(32));
	}

	#[test]
	fn test_remove_selectors() {
		assert!(encode_remove(&as_key!("k"), TransactionId::NONE).unwrap().starts_with("0x95bc2673"));
		assert!(encode_remove(&as_key!("k"), TransactionId::generate()).unwrap().starts_with("0x41131785"));
	}

	#[test]
	fn test_oversized_key_is_rejected() {
		let err = encode_put(&ByteKey::new([1u8; 33]), &as_value!("v"), TransactionId::NONE).unwrap_err();
		assert_eq!(
			err,
			Error::ValueTooLarge {
				len: 33,
				max: 32
			}
		);
	}

	#[test]
	fn test_put_batch_round_trip() {
		for count in [0usize, 1, 5] {
			let ops: Vec<PutOp> = (0..count)
				.map(|i| PutOp::new("t", ByteKey::new([i as u8 + 1; WORD]), ByteValue::new([i as u8 + 100; WORD])))
				.collect();
			let tx = TransactionId::generate();

			let decoded = decode_put_batch(&encode_put_batch(&ops, tx).unwrap()).unwrap();
			assert_eq!(decoded.tx, tx);
			assert_eq!(decoded.keys, ops.iter().map(|op| op.key.clone()).collect::<Vec<_>>());
			assert_eq!(decoded.values, ops.iter().map(|op| op.value.clone()).collect::<Vec<_>>());
		}
	}

	#[test]
	fn test_direct_batch_omits_tx_id() {
		let ops = vec![PutOp::new("t", "a", "1"), PutOp::new("t", "b", "2")];
		let data = encode_put_batch(&ops, TransactionId::NONE).unwrap();
		assert!(data.starts_with("0xf8c704a6"));
		assert_eq!(data.len(), 2 + 8 + 6 * 64);

		let staged = encode_put_batch(&ops, TransactionId::generate()).unwrap();
		assert!(staged.starts_with("0x9bc991c7"));
		assert_eq!(staged.len(), 2 + 8 + 7 * 64);

		let decoded = decode_put_batch(&data).unwrap();
		assert!(decoded.tx.is_none());
		assert_eq!(decoded.keys[1].truncated(1), as_key!("b"));
	}

	#[test]
	fn test_prepare_put_batch_layout() {
		let tx = TransactionId::from_bytes([0x22; 16]);
		let ops = vec![PutOp::new("t", "a", "1")];
		let data = encode_put_batch(&ops, tx).unwrap();

		let expected = format!(
			"0x9bc991c7{}{}{}{}{}",
			format!("{}{}", "22".repeat(16), "0".repeat(32)),
			format!("{:0>64}", "40"),
			format!("{:0>64}", "2"),
			format!("{:0<64}", "61"),
			format!("{:0<64}", "31"),
		);
		assert_eq!(data, expected);
	}

	#[test]
	fn test_remove_batch_layout() {
		let ops = vec![RemoveOp::new("t", "a"), RemoveOp::new("t", "b")];
		let data = encode_remove_batch(&ops, TransactionId::NONE).unwrap();

		let expected = format!(
			"0x2d9bb756{}{}{}{}",
			format!("{:0>64}", "20"),
			format!("{:0>64}", "2"),
			format!("{:0<64}", "61"),
			format!("{:0<64}", "62"),
		);
		assert_eq!(data, expected);
	}

	#[test]
	fn test_decode_batch_rejects_oversized_length() {
		let data = format!(
			"0x{}{}{}{}",
			hex::encode(selector::PUT_BATCH),
			word_hex(uint_word(0x20)),
			word_hex(uint_word(1 << 60)),
			word_hex(bytes_word(b"a").unwrap()),
		);
		let err = decode_put_batch(&data).unwrap_err();
		assert_eq!(err.code(), "LEDGER_006");

		let max = format!("0x{}{}{}", hex::encode(selector::REMOVE_BATCH), word_hex(uint_word(0x20)), word_hex(uint_word(u64::MAX)));
		assert_eq!(decode_remove_batch(&max).unwrap_err().code(), "LEDGER_006");
	}

	#[test]
	fn test_decode_batch_rejects_bad_offset() {
		let data = format!("0x{}{}{}", hex::encode(selector::REMOVE_BATCH), word_hex(uint_word(0x40)), word_hex(uint_word(0)));
		assert_eq!(decode_remove_batch(&data).unwrap_err().code(), "LEDGER_006");
	}

	#[test]
	fn test_remove_batch_round_trip() {
		let ops = vec![RemoveOp::new("t", "a"), RemoveOp::new("t", "b")];
		let tx = TransactionId::generate();
		let decoded = decode_remove_batch(&encode_remove_batch(&ops, tx).unwrap()).unwrap();
		assert_eq!(decoded.tx, tx);
		assert_eq!(decoded.keys.len(), 2);
		assert!(decoded.values.is_empty());
		assert!(decode_put_batch(&encode_remove_batch(&ops, tx).unwrap()).is_err());
	}

	#[test]
	fn test_decode_table_scan() {
		let response = scan_response(&[("k1", "value-1"), ("k2", "value-2")]);
		let rows = decode_table_scan(&response, TableLayout::new(2, 7)).unwrap();
		assert_eq!(rows, vec![(as_key!("k1"), as_value!("value-1")), (as_key!("k2"), as_value!("value-2"))]);
	}

	#[test]
	fn test_decode_empty_table_scan() {
		let rows = decode_table_scan(&scan_response(&[]), TableLayout::new(4, 4)).unwrap();
		assert!(rows.is_empty());
	}

	#[test]
	fn test_decode_table_scan_malformed() {
		assert!(decode_table_scan("0x", TableLayout::new(4, 4)).is_err());
		assert!(decode_table_scan("0x1234", TableLayout::new(4, 4)).is_err());

		let mut truncated = scan_response(&[("k1", "v1")]);
		truncated.truncate(truncated.len() - 64);
		let err = decode_table_scan(&truncated, TableLayout::new(2, 2)).unwrap_err();
		assert_eq!(err.code(), "LEDGER_006");
	}

	#[test]
	fn test_decode_table_scan_huge_count() {
		for count in [u64::MAX, 1 << 60] {
			let response = format!(
				"0x{}{}{}",
				word_hex(uint_word(0x40)),
				word_hex(uint_word(0x60)),
				word_hex(uint_word(count))
			);
			let err = decode_table_scan(&response, TableLayout::new(4, 4)).unwrap_err();
			assert_eq!(err.code(), "LEDGER_006");
		}
	}

	#[test]
	fn test_decode_get() {
		let found = format!("0x{}{}", word_hex(uint_word(1)), word_hex(bytes_word(b"v").unwrap()));
		assert_eq!(decode_get(&found).unwrap().unwrap().truncated(1), as_value!("v"));

		let missing = format!("0x{}{}", word_hex(uint_word(0)), word_hex([0u8; WORD]));
		assert_eq!(decode_get(&missing).unwrap(), None);
		assert!(decode_get("0x").is_err());
	}

	#[test]
	fn test_commit_all_layout() {
		let tx = TransactionId::from_bytes([0x11; 16]);
		let addresses = vec!["0xBBFdd8bf1C5587F1ad262f63894D5FE60F2c2c38".to_string()];
		let data = encode_commit_all(tx, &addresses).unwrap();

		let expected = format!(
			"0x334c1176{}{}{}{}",
			format!("{}{}", "11".repeat(16), "0".repeat(32)),
			format!("{:0>64}", "40"),
			format!("{:0>64}", "1"),
			format!("{:0>64}", "bbfdd8bf1c5587f1ad262f63894d5fe60f2c2c38"),
		);
		assert_eq!(data, expected);
	}

	#[test]
	fn test_invalid_address() {
		let err = encode_commit_all(TransactionId::NONE, &["0xnothex".to_string()]).unwrap_err();
		assert_eq!(err.code(), "LEDGER_010");
	}
}
