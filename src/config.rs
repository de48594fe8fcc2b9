//! Tree-wide tuning knobs.
//!
//! Named, enumerated options rather than global state: a `Config` is built
//! once and threaded through `Tree::create`/`Tree::load`, the way the
//! teacher keeps a single `PAGE_SIZE` static but documents it as a
//! convenience rather than a design requirement.

/// The size of a single page in bytes, for both the main file and the
/// one-page null-key file.
pub const PAGE_SIZE: usize = 4096;

#[derive(Debug, Clone)]
pub struct Config {
    /// Largest serialized key size accepted by `put`, in bytes.
    pub max_key_size: usize,
    /// Largest root-to-leaf path length before a walk is considered
    /// evidence of a corrupt tree.
    pub max_depth: usize,
    /// Default number of (key, RID) pairs a cursor batch-fetches per
    /// refill, clamped into `[1, INDEX_CURSOR_PREFETCH_SIZE]`.
    pub cursor_prefetch_size: usize,
}

/// Upper bound accepted for a cursor's requested prefetch size.
pub const INDEX_CURSOR_PREFETCH_SIZE: usize = 256;

impl Default for Config {
    fn default() -> Self {
        Self {
            max_key_size: 1024,
            max_depth: 64,
            cursor_prefetch_size: 32,
        }
    }
}

impl Config {
    pub fn clamp_prefetch(&self, requested: usize) -> usize {
        requested.clamp(1, INDEX_CURSOR_PREFETCH_SIZE)
    }
}
