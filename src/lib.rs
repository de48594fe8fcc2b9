//! A persistent B+-tree index mapping keys to multisets of record ids.
//!
//! Backs non-unique equality and range lookups in a storage layer: a key
//! maps to as many RIDs as were inserted under it, duplicates included, and
//! `put`/`remove` are the only two write operations. See [`Tree`] for the
//! public surface.

pub mod bucket;
pub mod config;
pub mod cursor;
pub mod disk;
pub mod error;
pub mod key;
pub mod lock;
pub mod log;
pub mod page_cache;
pub mod rid;
pub mod tree;
pub mod util;
pub mod wal;

pub use config::{Config, INDEX_CURSOR_PREFETCH_SIZE, PAGE_SIZE};
pub use cursor::{KeyCursor, RangeCursor};
pub use error::{IndexError, IndexResult};
pub use key::{extend_boundary, Boundary, Encryption, FieldType, Key, KeyCodec, KeyItem, Side};
pub use log::init_log;
pub use page_cache::{FilePageCache, Page, PageCache};
pub use rid::Rid;
pub use tree::{Tree, ROOT_PAGE};
