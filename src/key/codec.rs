//! C1: key (de)serialization, with an optional symmetric-encryption wrapper.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::{IndexError, IndexResult};
use crate::key::composite::{extend_boundary, Boundary, Side};
use crate::key::item::{FieldType, Key, KeyItem};

const TAG_INTEGER: u8 = 0;
const TAG_VARCHAR: u8 = 1;

/// Symmetric encryption hook the embedding system may supply. When present,
/// every serialized key is wrapped as `[4-byte plaintext length of the
/// encrypted bytes][encrypted bytes]`.
pub trait Encryption: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Vec<u8>;
    fn decrypt(&self, ciphertext: &[u8]) -> Vec<u8>;
}

/// Serializes, deserializes, and orders the keys of one tree.
///
/// `field_types` fixes the shape of every stored key (`keySize` entries for
/// a composite tree, one entry otherwise). `compare` accepts keys that carry
/// `KeyItem::NegInf`/`PosInf` sentinel items — those never reach
/// `serialize`, only the composite-key boundary adapter's in-memory search
/// keys.
pub struct KeyCodec {
    field_types: Vec<FieldType>,
    encryption: Option<Arc<dyn Encryption>>,
}

impl KeyCodec {
    pub fn new(field_types: Vec<FieldType>, encryption: Option<Arc<dyn Encryption>>) -> Self {
        assert!(!field_types.is_empty(), "a tree needs at least one key field");
        Self {
            field_types,
            encryption,
        }
    }

    pub fn key_size(&self) -> usize {
        self.field_types.len()
    }

    pub fn field_types(&self) -> &[FieldType] {
        &self.field_types
    }

    /// Validates a fully-specified (non-boundary) key against this tree's
    /// declared field types, widening nothing since this crate has no
    /// implicit numeric coercions to perform.
    pub fn preprocess(&self, key: Key) -> IndexResult<Key> {
        if key.len() != self.field_types.len() {
            return Err(IndexError::OperationOnNonAggregable(format!(
                "key has {} fields, tree expects {}",
                key.len(),
                self.field_types.len()
            )));
        }
        for (item, expected) in key.0.iter().zip(self.field_types.iter()) {
            match item.field_type() {
                Some(actual) if actual == *expected => {}
                _ => {
                    return Err(IndexError::OperationOnNonAggregable(format!(
                        "key field type mismatch: expected {:?}",
                        expected
                    )))
                }
            }
        }
        Ok(key)
    }

    /// Validates a (possibly partial) range-query boundary key: every field
    /// it does carry must match this tree's declared type at that position,
    /// but it may carry fewer fields than `field_types`. The missing suffix
    /// is padded with the `NegInf`/`PosInf` sentinel `side`/`inclusive`
    /// call for, via `extend_boundary`, so a caller can bound a composite
    /// range scan with a key prefix instead of pre-padding by hand.
    pub fn preprocess_boundary(&self, key: Key, side: Side, inclusive: bool) -> IndexResult<Key> {
        if key.len() > self.field_types.len() {
            return Err(IndexError::OperationOnNonAggregable(format!(
                "boundary key has {} fields, tree expects at most {}",
                key.len(),
                self.field_types.len()
            )));
        }
        for (item, expected) in key.0.iter().zip(self.field_types.iter()) {
            match item.field_type() {
                Some(actual) if actual == *expected => {}
                _ => {
                    return Err(IndexError::OperationOnNonAggregable(format!(
                        "key field type mismatch: expected {:?}",
                        expected
                    )))
                }
            }
        }
        let boundary = if inclusive {
            Boundary::Inclusive
        } else {
            Boundary::Exclusive
        };
        Ok(extend_boundary(key, self.field_types.len(), side, boundary))
    }

    /// Serializes a key to its on-page form, failing with `KeyTooBig` if the
    /// result (after any encryption wrapping) exceeds `max_key_size`.
    pub fn serialize(&self, key: &Key, max_key_size: usize) -> IndexResult<Vec<u8>> {
        let mut plain = Vec::new();
        for item in &key.0 {
            match item {
                KeyItem::Integer(v) => {
                    plain.push(TAG_INTEGER);
                    plain.extend_from_slice(&v.to_be_bytes());
                }
                KeyItem::Varchar(s) => {
                    plain.push(TAG_VARCHAR);
                    plain.extend_from_slice(&(s.len() as u32).to_be_bytes());
                    plain.extend_from_slice(s.as_bytes());
                }
                KeyItem::NegInf | KeyItem::PosInf => {
                    return Err(IndexError::OperationOnNonAggregable(
                        "cannot serialize a boundary sentinel".into(),
                    ))
                }
            }
        }

        let on_page = match &self.encryption {
            Some(enc) => {
                let plain_len = plain.len() as u32;
                let encrypted = enc.encrypt(&plain);
                let mut out = Vec::with_capacity(4 + encrypted.len());
                out.extend_from_slice(&plain_len.to_le_bytes());
                out.extend_from_slice(&encrypted);
                out
            }
            None => plain,
        };

        if on_page.len() > max_key_size {
            return Err(IndexError::key_too_big(on_page.len(), max_key_size));
        }
        Ok(on_page)
    }

    pub fn deserialize(&self, bytes: &[u8]) -> IndexResult<Key> {
        let plain = match &self.encryption {
            Some(enc) => {
                let _plain_len = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
                enc.decrypt(&bytes[4..])
            }
            None => bytes.to_vec(),
        };

        let mut items = Vec::with_capacity(self.field_types.len());
        let mut cursor = 0usize;
        for expected in &self.field_types {
            let tag = plain[cursor];
            cursor += 1;
            match (tag, expected) {
                (TAG_INTEGER, FieldType::Integer) => {
                    let v = i64::from_be_bytes(plain[cursor..cursor + 8].try_into().unwrap());
                    cursor += 8;
                    items.push(KeyItem::Integer(v));
                }
                (TAG_VARCHAR, FieldType::Varchar) => {
                    let len = u32::from_be_bytes(plain[cursor..cursor + 4].try_into().unwrap())
                        as usize;
                    cursor += 4;
                    let s = String::from_utf8(plain[cursor..cursor + len].to_vec())
                        .map_err(|e| IndexError::corruption(format!("invalid utf8 key: {}", e)))?;
                    cursor += len;
                    items.push(KeyItem::Varchar(s));
                }
                _ => {
                    return Err(IndexError::corruption(
                        "key tag does not match declared field type",
                    ))
                }
            }
        }
        Ok(Key(items))
    }

    /// Total order over keys, including boundary keys carrying sentinel
    /// items.
    pub fn compare(&self, a: &Key, b: &Key) -> Ordering {
        a.cmp(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> KeyCodec {
        KeyCodec::new(vec![FieldType::Integer], None)
    }

    #[test]
    fn round_trips_integer_keys() {
        let c = codec();
        let key = Key::single(KeyItem::Integer(42));
        let bytes = c.serialize(&key, 1024).unwrap();
        assert_eq!(c.deserialize(&bytes).unwrap(), key);
    }

    #[test]
    fn rejects_oversized_keys() {
        let c = KeyCodec::new(vec![FieldType::Varchar], None);
        let key = Key::single(KeyItem::Varchar("x".repeat(100)));
        let err = c.serialize(&key, 16).unwrap_err();
        assert!(matches!(err, IndexError::KeyTooBig { .. }));
    }

    struct Xor(u8);
    impl Encryption for Xor {
        fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
            plaintext.iter().map(|b| b ^ self.0).collect()
        }
        fn decrypt(&self, ciphertext: &[u8]) -> Vec<u8> {
            ciphertext.iter().map(|b| b ^ self.0).collect()
        }
    }

    #[test]
    fn round_trips_through_encryption() {
        let c = KeyCodec::new(vec![FieldType::Integer], Some(Arc::new(Xor(0x5a))));
        let key = Key::single(KeyItem::Integer(-7));
        let bytes = c.serialize(&key, 1024).unwrap();
        assert_eq!(c.deserialize(&bytes).unwrap(), key);
    }
}
