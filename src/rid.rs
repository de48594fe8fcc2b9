//! Record identifiers: the opaque values the tree maps keys to.

use std::fmt;

/// A record id: a cluster id plus a position within that cluster. Compared
/// by identity (derived `PartialEq`/`Eq`/`Hash`), never by any ordering —
/// the tree only ever orders by key, never by RID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rid {
    pub cluster_id: i32,
    pub position: i64,
}

impl Rid {
    pub fn new(cluster_id: i32, position: i64) -> Self {
        Self {
            cluster_id,
            position,
        }
    }

    pub const ENCODED_SIZE: usize = 4 + 8;

    pub fn to_bytes(&self) -> [u8; Self::ENCODED_SIZE] {
        let mut buf = [0u8; Self::ENCODED_SIZE];
        buf[0..4].copy_from_slice(&self.cluster_id.to_be_bytes());
        buf[4..12].copy_from_slice(&self.position.to_be_bytes());
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let cluster_id = i32::from_be_bytes(bytes[0..4].try_into().unwrap());
        let position = i64::from_be_bytes(bytes[4..12].try_into().unwrap());
        Self::new(cluster_id, position)
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.cluster_id, self.position)
    }
}
