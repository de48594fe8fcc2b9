//! Leaf bucket: stores (key, RID multiset) entries in key order.

use crate::bucket::entry::LeafEntry;
use crate::bucket::{Header, HEADER_SIZE, NONE_PAGE, OFFSET_SIZE};
use crate::config::PAGE_SIZE;
use crate::error::{IndexError, IndexResult};
use crate::key::{Key, KeyCodec};
use crate::rid::Rid;

#[derive(Debug, Clone)]
pub struct LeafBucket {
    pub left_sibling: u32,
    pub right_sibling: u32,
    /// Meaningful only on the root page (page index 0).
    pub tree_size: u64,
    entries: Vec<LeafEntry>,
}

impl LeafBucket {
    pub fn new_empty() -> Self {
        Self {
            left_sibling: NONE_PAGE,
            right_sibling: NONE_PAGE,
            tree_size: 0,
            entries: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_raw_key(&self, i: usize) -> &[u8] {
        &self.entries[i].raw_key
    }

    pub fn get_key(&self, i: usize, codec: &KeyCodec) -> IndexResult<Key> {
        codec.deserialize(&self.entries[i].raw_key)
    }

    pub fn get_values(&self, i: usize) -> &[Rid] {
        &self.entries[i].rids
    }

    /// Binary search by key order. `>= 0` is an exact match index;
    /// `< 0` encodes the insertion point as `-(insertionPoint) - 1`.
    pub fn find(&self, key: &Key, codec: &KeyCodec) -> IndexResult<i64> {
        let mut lo = 0i64;
        let mut hi = self.entries.len() as i64 - 1;
        while lo <= hi {
            let mid = (lo + hi) / 2;
            let mid_key = self.get_key(mid as usize, codec)?;
            match mid_key.cmp(key) {
                std::cmp::Ordering::Equal => return Ok(mid),
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid - 1,
            }
        }
        Ok(-(lo) - 1)
    }

    fn current_payload(&self) -> usize {
        self.entries.iter().map(|e| e.encoded_len() + OFFSET_SIZE).sum()
    }

    fn fits(&self, extra: usize) -> bool {
        HEADER_SIZE + self.current_payload() + extra <= PAGE_SIZE
    }

    /// Inserts a brand-new leaf entry at `i`. Returns `false` (no mutation)
    /// if the page has no room, signalling the caller to split.
    pub fn add_new_leaf_entry(&mut self, i: usize, raw_key: Vec<u8>, rid: Rid) -> bool {
        let entry = LeafEntry::new(raw_key, rid);
        if !self.fits(entry.encoded_len() + OFFSET_SIZE) {
            return false;
        }
        self.entries.insert(i, entry);
        true
    }

    /// Appends a RID into entry `i`'s multiset. Returns `false` if the page
    /// has no room.
    pub fn append_new_leaf_entry(&mut self, i: usize, rid: Rid) -> bool {
        if !self.fits(Rid::ENCODED_SIZE) {
            return false;
        }
        self.entries[i].rids.push(rid);
        true
    }

    /// Removes one occurrence of `rid` from entry `i`'s multiset; removes
    /// the entry entirely if it becomes empty. Returns whether a removal
    /// happened.
    pub fn remove(&mut self, i: usize, rid: Rid) -> bool {
        let entry = &mut self.entries[i];
        match entry.rids.iter().position(|r| *r == rid) {
            Some(pos) => {
                entry.rids.remove(pos);
                if entry.rids.is_empty() {
                    self.entries.remove(i);
                }
                true
            }
            None => false,
        }
    }

    /// Entries from `from` to the end, cloned out for a split's right half.
    pub fn entries_from(&self, from: usize) -> Vec<LeafEntry> {
        self.entries[from..].to_vec()
    }

    /// Entries `[0, to)`, cloned out for a root split's left half.
    pub fn entries_before(&self, to: usize) -> Vec<LeafEntry> {
        self.entries[..to].to_vec()
    }

    /// Keeps only entries `[0, to_index)`.
    pub fn shrink(&mut self, to_index: usize) {
        self.entries.truncate(to_index);
    }

    /// Bulk-loads a freshly allocated bucket.
    pub fn add_all(&mut self, entries: Vec<LeafEntry>) {
        self.entries = entries;
    }

    pub fn decode(bytes: &[u8]) -> IndexResult<Self> {
        let header = Header::decode(bytes);
        if !header.is_leaf {
            return Err(IndexError::corruption("expected a leaf bucket"));
        }
        let mut entries = Vec::with_capacity(header.entry_count as usize);
        for slot in 0..header.entry_count as usize {
            let off_pos = HEADER_SIZE + slot * OFFSET_SIZE;
            let offset =
                u16::from_be_bytes(bytes[off_pos..off_pos + 2].try_into().unwrap()) as usize;
            let (entry, _) = LeafEntry::decode(bytes, offset);
            entries.push(entry);
        }
        Ok(Self {
            left_sibling: header.left_sibling,
            right_sibling: header.right_sibling,
            tree_size: header.tree_size,
            entries,
        })
    }

    pub fn encode(&self) -> IndexResult<[u8; PAGE_SIZE]> {
        if !self.fits(0) {
            return Err(IndexError::corruption(
                "leaf bucket contents exceed page size",
            ));
        }
        let mut page = [0u8; PAGE_SIZE];
        Header {
            is_leaf: true,
            entry_count: self.entries.len() as u16,
            left_sibling: self.left_sibling,
            right_sibling: self.right_sibling,
            tree_size: self.tree_size,
        }
        .encode(&mut page);

        let mut heap_cursor = PAGE_SIZE;
        for (i, entry) in self.entries.iter().enumerate() {
            let mut buf = Vec::with_capacity(entry.encoded_len());
            entry.encode(&mut buf);
            heap_cursor -= buf.len();
            page[heap_cursor..heap_cursor + buf.len()].copy_from_slice(&buf);

            let off_pos = HEADER_SIZE + i * OFFSET_SIZE;
            page[off_pos..off_pos + 2].copy_from_slice(&(heap_cursor as u16).to_be_bytes());
        }
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{FieldType, KeyItem};

    fn codec() -> KeyCodec {
        KeyCodec::new(vec![FieldType::Integer], None)
    }

    #[test]
    fn insert_find_and_round_trip_through_bytes() {
        let codec = codec();
        let mut bucket = LeafBucket::new_empty();
        for v in [10i64, 30, 20] {
            let key = Key::single(KeyItem::Integer(v));
            let raw = codec.serialize(&key, 1024).unwrap();
            let idx = bucket.find(&key, &codec).unwrap();
            assert!(idx < 0, "key should not exist yet");
            let insertion_point = (-idx - 1) as usize;
            assert!(bucket.add_new_leaf_entry(insertion_point, raw, Rid::new(0, v)));
        }
        assert_eq!(bucket.size(), 3);
        let keys: Vec<i64> = (0..3)
            .map(|i| match bucket.get_key(i, &codec).unwrap().0[0] {
                KeyItem::Integer(v) => v,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(keys, vec![10, 20, 30]);

        let bytes = bucket.encode().unwrap();
        let decoded = LeafBucket::decode(&bytes).unwrap();
        assert_eq!(decoded.size(), 3);
        assert_eq!(decoded.get_values(1)[0], Rid::new(0, 20));
    }

    #[test]
    fn append_and_remove_multiset_values() {
        let codec = codec();
        let mut bucket = LeafBucket::new_empty();
        let key = Key::single(KeyItem::Integer(1));
        let raw = codec.serialize(&key, 1024).unwrap();
        assert!(bucket.add_new_leaf_entry(0, raw, Rid::new(0, 1)));
        assert!(bucket.append_new_leaf_entry(0, Rid::new(0, 2)));
        assert_eq!(bucket.get_values(0).len(), 2);

        assert!(bucket.remove(0, Rid::new(0, 1)));
        assert_eq!(bucket.get_values(0), &[Rid::new(0, 2)]);
        assert!(bucket.remove(0, Rid::new(0, 2)));
        assert_eq!(bucket.size(), 0);
    }
}
