//! The two entry shapes a bucket holds (leaf vs internal), plus their
//! on-page encoding.

use crate::rid::Rid;

/// A leaf entry: a stored key plus the multiset of RIDs filed under it,
/// insertion order preserved.
#[derive(Debug, Clone)]
pub struct LeafEntry {
    pub raw_key: Vec<u8>,
    pub rids: Vec<Rid>,
}

impl LeafEntry {
    pub fn new(raw_key: Vec<u8>, rid: Rid) -> Self {
        Self {
            raw_key,
            rids: vec![rid],
        }
    }

    pub fn encoded_len(&self) -> usize {
        2 + self.raw_key.len() + 2 + self.rids.len() * Rid::ENCODED_SIZE
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.raw_key.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.raw_key);
        out.extend_from_slice(&(self.rids.len() as u16).to_be_bytes());
        for rid in &self.rids {
            out.extend_from_slice(&rid.to_bytes());
        }
    }

    /// Decodes one entry starting at `bytes[pos..]`, returning the entry and
    /// the position just past it.
    pub fn decode(bytes: &[u8], pos: usize) -> (Self, usize) {
        let mut cursor = pos;
        let key_len = u16::from_be_bytes(bytes[cursor..cursor + 2].try_into().unwrap()) as usize;
        cursor += 2;
        let raw_key = bytes[cursor..cursor + key_len].to_vec();
        cursor += key_len;
        let rid_count = u16::from_be_bytes(bytes[cursor..cursor + 2].try_into().unwrap()) as usize;
        cursor += 2;
        let mut rids = Vec::with_capacity(rid_count);
        for _ in 0..rid_count {
            rids.push(Rid::from_bytes(&bytes[cursor..cursor + Rid::ENCODED_SIZE]));
            cursor += Rid::ENCODED_SIZE;
        }
        (Self { raw_key, rids }, cursor)
    }
}

/// An internal entry: a separator key plus the pair of child pages it
/// divides. Adjacent entries share a child pointer (entry i's right child
/// equals entry i+1's left child).
#[derive(Debug, Clone)]
pub struct InternalEntry {
    pub raw_key: Vec<u8>,
    pub left_child: u32,
    pub right_child: u32,
}

impl InternalEntry {
    pub fn encoded_len(&self) -> usize {
        2 + self.raw_key.len() + 4 + 4
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.raw_key.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.raw_key);
        out.extend_from_slice(&self.left_child.to_be_bytes());
        out.extend_from_slice(&self.right_child.to_be_bytes());
    }

    pub fn decode(bytes: &[u8], pos: usize) -> (Self, usize) {
        let mut cursor = pos;
        let key_len = u16::from_be_bytes(bytes[cursor..cursor + 2].try_into().unwrap()) as usize;
        cursor += 2;
        let raw_key = bytes[cursor..cursor + key_len].to_vec();
        cursor += key_len;
        let left_child = u32::from_be_bytes(bytes[cursor..cursor + 4].try_into().unwrap());
        cursor += 4;
        let right_child = u32::from_be_bytes(bytes[cursor..cursor + 4].try_into().unwrap());
        cursor += 4;
        (
            Self {
                raw_key,
                left_child,
                right_child,
            },
            cursor,
        )
    }
}
