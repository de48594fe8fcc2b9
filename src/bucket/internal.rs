//! Internal bucket: separator-key entries whose children overlap at the
//! boundary (entry i's right child is entry i+1's left child).

use crate::bucket::entry::InternalEntry;
use crate::bucket::{Header, HEADER_SIZE, NONE_PAGE, OFFSET_SIZE};
use crate::config::PAGE_SIZE;
use crate::error::{IndexError, IndexResult};
use crate::key::{Key, KeyCodec};

#[derive(Debug, Clone)]
pub struct InternalBucket {
    pub left_sibling: u32,
    pub right_sibling: u32,
    /// Meaningful only on the root page (page index 0).
    pub tree_size: u64,
    entries: Vec<InternalEntry>,
}

impl InternalBucket {
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

    pub fn get_left(&self, i: usize) -> u32 {
        self.entries[i].left_child
    }

    pub fn get_right(&self, i: usize) -> u32 {
        self.entries[i].right_child
    }

    /// Same contract as `LeafBucket::find`: binary search over separator
    /// keys.
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

    /// Inserts a separator entry at `i`. When `update_neighbors` is set,
    /// rewrites the adjacent entries so the shared-child-pointer invariant
    /// holds across the new entry's boundaries. Returns `false` if the page
    /// has no room.
    pub fn add_non_leaf_entry(
        &mut self,
        i: usize,
        raw_key: Vec<u8>,
        left_child: u32,
        right_child: u32,
        update_neighbors: bool,
    ) -> bool {
        let entry = InternalEntry {
            raw_key,
            left_child,
            right_child,
        };
        if !self.fits(entry.encoded_len() + OFFSET_SIZE) {
            return false;
        }
        self.entries.insert(i, entry);
        if update_neighbors {
            if i > 0 {
                self.entries[i - 1].right_child = left_child;
            }
            if i + 1 < self.entries.len() {
                self.entries[i + 1].left_child = right_child;
            }
        }
        true
    }

    pub fn entries_from(&self, from: usize) -> Vec<InternalEntry> {
        self.entries[from..].to_vec()
    }

    pub fn entries_before(&self, to: usize) -> Vec<InternalEntry> {
        self.entries[..to].to_vec()
    }

    pub fn shrink(&mut self, to_index: usize) {
        self.entries.truncate(to_index);
    }

    pub fn add_all(&mut self, entries: Vec<InternalEntry>) {
        self.entries = entries;
    }

    pub fn decode(bytes: &[u8]) -> IndexResult<Self> {
        let header = Header::decode(bytes);
        if header.is_leaf {
            return Err(IndexError::corruption("expected an internal bucket"));
        }
        let mut entries = Vec::with_capacity(header.entry_count as usize);
        for slot in 0..header.entry_count as usize {
            let off_pos = HEADER_SIZE + slot * OFFSET_SIZE;
            let offset =
                u16::from_be_bytes(bytes[off_pos..off_pos + 2].try_into().unwrap()) as usize;
            let (entry, _) = InternalEntry::decode(bytes, offset);
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
                "internal bucket contents exceed page size",
            ));
        }
        let mut page = [0u8; PAGE_SIZE];
        Header {
            is_leaf: false,
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

    #[test]
    fn update_neighbors_preserves_shared_child_invariant() {
        let codec = KeyCodec::new(vec![FieldType::Integer], None);
        let mut bucket = InternalBucket::new_empty();
        let sep_a = codec.serialize(&Key::single(KeyItem::Integer(10)), 1024).unwrap();
        let sep_b = codec.serialize(&Key::single(KeyItem::Integer(20)), 1024).unwrap();

        assert!(bucket.add_non_leaf_entry(0, sep_a, 1, 2, false));
        // Splitting child 2 into (2, 3): insert separator 20 at index 1,
        // with left=2 right=3, and fix neighbor 0's right child to 2.
        assert!(bucket.add_non_leaf_entry(1, sep_b, 2, 3, true));

        assert_eq!(bucket.get_right(0), 2);
        assert_eq!(bucket.get_left(1), 2);
        assert_eq!(bucket.get_right(1), 3);
    }

    #[test]
    fn round_trips_through_bytes() {
        let codec = KeyCodec::new(vec![FieldType::Integer], None);
        let mut bucket = InternalBucket::new_empty();
        let sep = codec.serialize(&Key::single(KeyItem::Integer(5)), 1024).unwrap();
        bucket.add_non_leaf_entry(0, sep, 7, 8, false);
        let bytes = bucket.encode().unwrap();
        let decoded = InternalBucket::decode(&bytes).unwrap();
        assert_eq!(decoded.get_left(0), 7);
        assert_eq!(decoded.get_right(0), 8);
    }
}
