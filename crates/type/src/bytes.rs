// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

//! Immutable byte sequences used as table keys and values.
//!
//! Both types share their backing allocation, so a key staged in a
//! transaction buffer and the same key captured by an in-flight ledger call
//! point at one buffer. Equality, ordering and hashing are by content.

use std::{borrow::Borrow, fmt, ops::Deref, sync::Arc};

use crate::util::hex;

macro_rules! shared_bytes {
	($(#[$meta:meta])* $name:ident) => {
		$(#[$meta])*
		#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
		pub struct $name(Arc<[u8]>);

		impl $name {
			pub fn new(bytes: impl AsRef<[u8]>) -> Self {
				Self(Arc::from(bytes.as_ref()))
			}

			pub fn empty() -> Self {
				Self(Arc::from(&[][..]))
			}

			#[inline]
			pub fn as_bytes(&self) -> &[u8] {
				&self.0
			}

			#[inline]
			pub fn len(&self) -> usize {
				self.0.len()
			}

			#[inline]
			pub fn is_empty(&self) -> bool {
				self.0.is_empty()
			}

			/// Copy of the first `len` bytes, or of everything if shorter.
			pub fn truncated(&self, len: usize) -> Self {
				if len >= self.0.len() {
					return self.clone();
				}
				Self::new(&self.0[..len])
			}
		}

		impl Deref for $name {
			type Target = [u8];

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}

		impl Borrow<[u8]> for $name {
			fn borrow(&self) -> &[u8] {
				&self.0
			}
		}

		impl AsRef<[u8]> for $name {
			fn as_ref(&self) -> &[u8] {
				&self.0
			}
		}

		impl From<Vec<u8>> for $name {
			fn from(bytes: Vec<u8>) -> Self {
				Self(Arc::from(bytes))
			}
		}

		impl From<&[u8]> for $name {
			fn from(bytes: &[u8]) -> Self {
				Self::new(bytes)
			}
		}

		impl From<&str> for $name {
			fn from(text: &str) -> Self {
				Self::new(text.as_bytes())
			}
		}

		impl fmt::Debug for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}(0x{})", stringify!($name), hex::encode(&self.0))
			}
		}
	};
}

shared_bytes!(
	/// Primary key bytes of one row.
	ByteKey
);

shared_bytes!(
	/// Non-key column bytes of one row.
	ByteValue
);

#[macro_export]
macro_rules! as_key {
	($key:expr) => {
		$crate::bytes::ByteKey::from($key)
	};
}

#[macro_export]
macro_rules! as_value {
	($value:expr) => {
		$crate::bytes::ByteValue::from($value)
	};
}

#[cfg(test)]
mod tests {
	use std::{
		collections::hash_map::DefaultHasher,
		hash::{Hash, Hasher},
	};

	use super::*;

	fn hash_of<T: Hash>(value: &T) -> u64 {
		let mut hasher = DefaultHasher::new();
		value.hash(&mut hasher);
		hasher.finish()
	}

	#[test]
	fn test_equal_by_content() {
		let a = ByteKey::new([1u8, 2, 3]);
		let b = ByteKey::from(vec![1u8, 2, 3]);
		assert_eq!(a, b);
		assert_eq!(hash_of(&a), hash_of(&b));
		assert_ne!(a, ByteKey::new([1u8, 2]));
	}

	#[test]
	fn test_clone_shares_allocation() {
		let a = ByteValue::from("payload");
		let b = a.clone();
		assert!(std::ptr::eq(a.as_bytes().as_ptr(), b.as_bytes().as_ptr()));
	}

	#[test]
	fn test_truncated() {
		let value = ByteValue::new([7u8; 32]);
		assert_eq!(value.truncated(4).as_bytes(), &[7u8; 4]);
		assert_eq!(value.truncated(64), value);
	}

	#[test]
	fn test_debug_is_hex() {
		assert_eq!(format!("{:?}", as_key!("ab")), "ByteKey(0x6162)");
	}
}
