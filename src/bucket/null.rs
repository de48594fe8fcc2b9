//! C3: the null-key side bucket -- a single page holding the multiset of
//! RIDs filed under the null key, kept out of the tree entirely.

use crate::config::PAGE_SIZE;
use crate::error::{IndexError, IndexResult};
use crate::rid::Rid;

const COUNT_SIZE: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct NullBucket {
    rids: Vec<Rid>,
}

impl NullBucket {
    pub fn new_empty() -> Self {
        Self { rids: Vec::new() }
    }

    pub fn get_values(&self) -> &[Rid] {
        &self.rids
    }

    /// Returns `false` if the page has no room for one more RID.
    pub fn add_value(&mut self, rid: Rid) -> bool {
        if COUNT_SIZE + (self.rids.len() + 1) * Rid::ENCODED_SIZE > PAGE_SIZE {
            return false;
        }
        self.rids.push(rid);
        true
    }

    pub fn remove_value(&mut self, rid: Rid) -> bool {
        match self.rids.iter().position(|r| *r == rid) {
            Some(pos) => {
                self.rids.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn decode(bytes: &[u8]) -> IndexResult<Self> {
        let count = u32::from_be_bytes(bytes[0..4].try_into().unwrap()) as usize;
        if COUNT_SIZE + count * Rid::ENCODED_SIZE > bytes.len() {
            return Err(IndexError::corruption("null bucket count overruns page"));
        }
        let mut rids = Vec::with_capacity(count);
        let mut cursor = COUNT_SIZE;
        for _ in 0..count {
            rids.push(Rid::from_bytes(&bytes[cursor..cursor + Rid::ENCODED_SIZE]));
            cursor += Rid::ENCODED_SIZE;
        }
        Ok(Self { rids })
    }

    pub fn encode(&self) -> IndexResult<[u8; PAGE_SIZE]> {
        if COUNT_SIZE + self.rids.len() * Rid::ENCODED_SIZE > PAGE_SIZE {
            return Err(IndexError::corruption("null bucket contents exceed page size"));
        }
        let mut page = [0u8; PAGE_SIZE];
        page[0..4].copy_from_slice(&(self.rids.len() as u32).to_be_bytes());
        let mut cursor = COUNT_SIZE;
        for rid in &self.rids {
            page[cursor..cursor + Rid::ENCODED_SIZE].copy_from_slice(&rid.to_bytes());
            cursor += Rid::ENCODED_SIZE;
        }
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_remove_and_round_trip() {
        let mut bucket = NullBucket::new_empty();
        assert!(bucket.add_value(Rid::new(0, 1)));
        assert!(bucket.add_value(Rid::new(0, 2)));
        assert_eq!(bucket.get_values(), &[Rid::new(0, 1), Rid::new(0, 2)]);

        let bytes = bucket.encode().unwrap();
        let decoded = NullBucket::decode(&bytes).unwrap();
        assert_eq!(decoded.get_values(), bucket.get_values());

        let mut decoded = decoded;
        assert!(decoded.remove_value(Rid::new(0, 1)));
        assert!(!decoded.remove_value(Rid::new(0, 1)));
        assert_eq!(decoded.get_values(), &[Rid::new(0, 2)]);
    }
}
