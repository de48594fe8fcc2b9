//! C4: tree algorithms (search, insert, split, delete, first/last) and C8:
//! lifecycle (create/load/clear/delete/close/flush).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::bucket::{Bucket, InternalBucket, LeafBucket, NullBucket, NONE_PAGE};
use crate::config::{Config, PAGE_SIZE};
use crate::cursor::{KeyCursor, RangeCursor};
use crate::disk::PageFile;
use crate::error::{IndexError, IndexResult};
use crate::key::{Encryption, FieldType, Key, KeyCodec, Side};
use crate::lock::{ReadGuard, TreeLock, WriteOp};
use crate::page_cache::{FilePageCache, PageCache};
use crate::rid::Rid;
use crate::util::HandyRwLock;
use crate::wal::WalWriter;

pub const ROOT_PAGE: u32 = 0;

/// A persistent B+-tree index mapping keys to multisets of RIDs, generic
/// over the page cache the embedding system supplies.
pub struct Tree<C: PageCache = FilePageCache> {
    cache: C,
    null_file: Option<PageFile>,
    codec: KeyCodec,
    config: Config,
    lock: TreeLock,
    main_path: PathBuf,
    null_path: Option<PathBuf>,
}

impl Tree<FilePageCache> {
    /// Initializes a fresh tree: an empty leaf root at page 0, and if
    /// `null_path` is given, a one-page null-key file.
    pub fn create(
        main_path: impl AsRef<Path>,
        null_path: Option<PathBuf>,
        field_types: Vec<FieldType>,
        encryption: Option<Arc<dyn Encryption>>,
        config: Config,
    ) -> IndexResult<Self> {
        let main_path = main_path.as_ref().to_path_buf();
        let cache = FilePageCache::create(&main_path)?;
        let root_page = cache.add_page()?;
        debug_assert_eq!(root_page, ROOT_PAGE);
        let root = LeafBucket::new_empty();
        {
            let page = cache.load_for_write(ROOT_PAGE)?;
            let mut guard = page.wl();
            guard.bytes = root.encode()?;
            guard.dirty = true;
        }
        cache.release(ROOT_PAGE)?;

        let null_file = match &null_path {
            Some(p) => {
                let file = PageFile::create(p)?;
                file.allocate_page()?;
                file.write_page(0, &NullBucket::new_empty().encode()?)?;
                Some(file)
            }
            None => None,
        };

        let wal_path = wal_path_for(&main_path);
        let lock = TreeLock::new(WalWriter::open(wal_path)?);
        let codec = KeyCodec::new(field_types, encryption);

        Ok(Self {
            cache,
            null_file,
            codec,
            config,
            lock,
            main_path,
            null_path,
        })
    }

    /// Reopens a tree previously built with `create`.
    pub fn load(
        main_path: impl AsRef<Path>,
        null_path: Option<PathBuf>,
        field_types: Vec<FieldType>,
        encryption: Option<Arc<dyn Encryption>>,
        config: Config,
    ) -> IndexResult<Self> {
        let main_path = main_path.as_ref().to_path_buf();
        let cache = FilePageCache::open(&main_path)?;
        let null_file = match &null_path {
            Some(p) => Some(PageFile::open(p)?),
            None => None,
        };
        let wal_path = wal_path_for(&main_path);
        let lock = TreeLock::new(WalWriter::open(wal_path)?);
        let codec = KeyCodec::new(field_types, encryption);

        Ok(Self {
            cache,
            null_file,
            codec,
            config,
            lock,
            main_path,
            null_path,
        })
    }
}

impl<C: PageCache> Tree<C> {
    pub fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn lock_for_read(&self) -> IndexResult<ReadGuard<'_>> {
        self.lock.begin_read()
    }

    // ---- page-local helpers -------------------------------------------

    pub(crate) fn read_bucket(&self, page_id: u32) -> IndexResult<Bucket> {
        let page = self.cache.load_for_read(page_id)?;
        let bucket = Bucket::decode(&page.rl().bytes)?;
        self.cache.release(page_id)?;
        Ok(bucket)
    }

    fn write_page_bytes(&self, page_id: u32, bytes: [u8; PAGE_SIZE], op: &WriteOp) -> IndexResult<()> {
        let page = self.cache.load_for_write(page_id)?;
        {
            let mut guard = page.wl();
            guard.bytes = bytes;
            guard.dirty = true;
        }
        self.cache.release(page_id)?;
        op.log_page_update(page_id)?;
        Ok(())
    }

    fn write_bucket(&self, page_id: u32, bucket: &Bucket, op: &WriteOp) -> IndexResult<()> {
        self.write_page_bytes(page_id, bucket.encode()?, op)
    }

    fn read_null_bucket(&self) -> IndexResult<NullBucket> {
        let file = self.null_file.as_ref().ok_or(IndexError::NullKeyDisallowed)?;
        let mut bytes = [0u8; PAGE_SIZE];
        file.read_page(0, &mut bytes)?;
        NullBucket::decode(&bytes)
    }

    fn write_null_bucket(&self, bucket: &NullBucket) -> IndexResult<()> {
        let file = self.null_file.as_ref().ok_or(IndexError::NullKeyDisallowed)?;
        file.write_page(0, &bucket.encode()?)
    }

    // ---- search ---------------------------------------------------------

    /// Walks from the root to the leaf that should contain `key`. Returns
    /// the page-id path (root first, leaf last) and the leaf's `find`
    /// result (`>=0` exact match, `<0` insertion point).
    pub(crate) fn find_bucket(&self, key: &Key) -> IndexResult<(Vec<u32>, i64)> {
        let mut path = vec![ROOT_PAGE];
        let mut current = ROOT_PAGE;
        loop {
            if path.len() > self.config.max_depth {
                return Err(IndexError::corruption("path length exceeded max depth"));
            }
            match self.read_bucket(current)? {
                Bucket::Leaf(leaf) => {
                    let idx = leaf.find(key, &self.codec)?;
                    return Ok((path, idx));
                }
                Bucket::Internal(internal) => {
                    let next = Self::route(&internal, key, &self.codec)?;
                    path.push(next);
                    current = next;
                }
            }
        }
    }

    fn route(internal: &InternalBucket, key: &Key, codec: &KeyCodec) -> IndexResult<u32> {
        if internal.is_empty() {
            return Err(IndexError::corruption("internal bucket with no entries"));
        }
        let i = internal.find(key, codec)?;
        Ok(if i >= 0 {
            internal.get_right(i as usize)
        } else {
            let insertion_point = (-i - 1) as usize;
            if insertion_point < internal.size() {
                internal.get_left(insertion_point)
            } else {
                internal.get_right(internal.size() - 1)
            }
        })
    }

    /// Walks from the root, stopping one level above `target_child`: returns
    /// the path to `target_child`'s current parent. Used to re-locate where
    /// a promoted separator belongs after an ancestor split changes the
    /// tree shape out from under the original path.
    fn path_to_parent_of(&self, key: &Key, target_child: u32) -> IndexResult<Vec<u32>> {
        let mut path = vec![ROOT_PAGE];
        let mut current = ROOT_PAGE;
        loop {
            let internal = match self.read_bucket(current)? {
                Bucket::Internal(i) => i,
                Bucket::Leaf(_) => {
                    return Err(IndexError::corruption("expected an internal bucket on the path"))
                }
            };
            let next = Self::route(&internal, key, &self.codec)?;
            if next == target_child {
                return Ok(path);
            }
            path.push(next);
            current = next;
        }
    }

    pub(crate) fn leftmost_leaf(&self) -> IndexResult<u32> {
        let mut current = ROOT_PAGE;
        loop {
            match self.read_bucket(current)? {
                Bucket::Leaf(_) => return Ok(current),
                Bucket::Internal(i) => {
                    if i.is_empty() {
                        return Err(IndexError::corruption("internal bucket with no entries"));
                    }
                    current = i.get_left(0);
                }
            }
        }
    }

    pub(crate) fn rightmost_leaf(&self) -> IndexResult<u32> {
        let mut current = ROOT_PAGE;
        loop {
            match self.read_bucket(current)? {
                Bucket::Leaf(_) => return Ok(current),
                Bucket::Internal(i) => {
                    if i.is_empty() {
                        return Err(IndexError::corruption("internal bucket with no entries"));
                    }
                    current = i.get_right(i.size() - 1);
                }
            }
        }
    }

    // ---- reads ------------------------------------------------------------

    pub fn get(&self, key: Option<Key>) -> IndexResult<Vec<Rid>> {
        let _guard = self.lock.begin_read()?;
        match key {
            None => Ok(self.read_null_bucket()?.get_values().to_vec()),
            Some(k) => {
                let k = self.codec.preprocess(k)?;
                let (path, idx) = self.find_bucket(&k)?;
                if idx < 0 {
                    return Ok(Vec::new());
                }
                let leaf_page = *path.last().unwrap();
                let bucket = self.read_bucket(leaf_page)?;
                let leaf = bucket
                    .as_leaf()
                    .ok_or_else(|| IndexError::corruption("search path did not end at a leaf"))?;
                Ok(leaf.get_values(idx as usize).to_vec())
            }
        }
    }

    pub fn size(&self) -> IndexResult<u64> {
        let _guard = self.lock.begin_read()?;
        Ok(self.read_bucket(ROOT_PAGE)?.tree_size())
    }

    pub fn first_key(&self) -> IndexResult<Option<Key>> {
        let _guard = self.lock.begin_read()?;
        let mut page = self.leftmost_leaf()?;
        loop {
            let bucket = self.read_bucket(page)?;
            let leaf = bucket.as_leaf().unwrap();
            if !leaf.is_empty() {
                return Ok(Some(leaf.get_key(0, &self.codec)?));
            }
            if leaf.right_sibling == NONE_PAGE {
                return Ok(None);
            }
            page = leaf.right_sibling;
        }
    }

    pub fn last_key(&self) -> IndexResult<Option<Key>> {
        let _guard = self.lock.begin_read()?;
        let mut page = self.rightmost_leaf()?;
        loop {
            let bucket = self.read_bucket(page)?;
            let leaf = bucket.as_leaf().unwrap();
            if !leaf.is_empty() {
                return Ok(Some(leaf.get_key(leaf.size() - 1, &self.codec)?));
            }
            if leaf.left_sibling == NONE_PAGE {
                return Ok(None);
            }
            page = leaf.left_sibling;
        }
    }

    // ---- cursors --------------------------------------------------------

    /// Entries whose keys fall in `[low, high]`, bounds applied per the
    /// given inclusivity flags. `None` on either side means unbounded on
    /// that side. A composite-key bound may carry fewer than `key_size`
    /// fields; it is padded out to full width with the sentinel appropriate
    /// to that bound's own side and inclusivity, so a caller can scan a
    /// key prefix without pre-padding by hand.
    pub fn iterate_entries_between(
        &self,
        low: Option<Key>,
        low_inclusive: bool,
        high: Option<Key>,
        high_inclusive: bool,
        ascending: bool,
    ) -> IndexResult<RangeCursor<'_, C>> {
        let low = low
            .map(|k| self.codec.preprocess_boundary(k, Side::Lower, low_inclusive))
            .transpose()?;
        let high = high
            .map(|k| self.codec.preprocess_boundary(k, Side::Upper, high_inclusive))
            .transpose()?;
        RangeCursor::new(
            self,
            low,
            low_inclusive,
            high,
            high_inclusive,
            ascending,
            self.config.cursor_prefetch_size,
        )
    }

    /// Entries with keys below (or at, if `inclusive`) `key`.
    pub fn iterate_entries_minor(
        &self,
        key: Key,
        inclusive: bool,
        ascending: bool,
    ) -> IndexResult<RangeCursor<'_, C>> {
        self.iterate_entries_between(None, true, Some(key), inclusive, ascending)
    }

    /// Entries with keys above (or at, if `inclusive`) `key`.
    pub fn iterate_entries_major(
        &self,
        key: Key,
        inclusive: bool,
        ascending: bool,
    ) -> IndexResult<RangeCursor<'_, C>> {
        self.iterate_entries_between(Some(key), inclusive, None, true, ascending)
    }

    /// Ascending cursor over every distinct stored key.
    pub fn key_cursor(&self) -> IndexResult<KeyCursor<'_, C>> {
        KeyCursor::new(self)
    }

    // ---- writes -------------------------------------------------------

    pub fn put(&self, key: Option<Key>, rid: Rid) -> IndexResult<()> {
        let op = self.lock.begin_write()?;
        self.put_locked(&op, key, rid)?;
        op.commit()
    }

    fn bump_tree_size(&self, op: &WriteOp, delta: i64) -> IndexResult<()> {
        let mut root = self.read_bucket(ROOT_PAGE)?;
        let new_size = (root.tree_size() as i64 + delta).max(0) as u64;
        root.set_tree_size(new_size);
        self.write_bucket(ROOT_PAGE, &root, op)
    }

    fn put_locked(&self, op: &WriteOp, key: Option<Key>, rid: Rid) -> IndexResult<()> {
        match key {
            None => {
                let mut nb = self.read_null_bucket()?;
                if !nb.add_value(rid) {
                    return Err(IndexError::corruption("null bucket has no room"));
                }
                self.write_null_bucket(&nb)?;
            }
            Some(k) => {
                let k = self.codec.preprocess(k)?;
                let raw = self.codec.serialize(&k, self.config.max_key_size)?;
                loop {
                    let (path, idx) = self.find_bucket(&k)?;
                    let leaf_page = *path.last().unwrap();
                    let mut bucket = self.read_bucket(leaf_page)?;
                    let leaf = bucket.as_leaf_mut().ok_or_else(|| {
                        IndexError::corruption("search path did not end at a leaf")
                    })?;
                    let ok = if idx >= 0 {
                        leaf.append_new_leaf_entry(idx as usize, rid)
                    } else {
                        leaf.add_new_leaf_entry((-idx - 1) as usize, raw.clone(), rid)
                    };
                    if ok {
                        self.write_bucket(leaf_page, &bucket, op)?;
                        break;
                    }
                    self.split_chain(op, &path)?;
                    // retry: the tree shape changed, re-run find_bucket
                }
            }
        }
        self.bump_tree_size(op, 1)
    }

    pub fn remove(&self, key: Option<Key>, rid: Rid) -> IndexResult<bool> {
        let op = self.lock.begin_write()?;
        let removed = self.remove_locked(&op, key, rid)?;
        op.commit()?;
        Ok(removed)
    }

    fn remove_locked(&self, op: &WriteOp, key: Option<Key>, rid: Rid) -> IndexResult<bool> {
        let removed = match key {
            None => {
                let mut nb = self.read_null_bucket()?;
                let removed = nb.remove_value(rid);
                if removed {
                    self.write_null_bucket(&nb)?;
                }
                removed
            }
            Some(k) => {
                let k = self.codec.preprocess(k)?;
                let (path, idx) = self.find_bucket(&k)?;
                if idx < 0 {
                    false
                } else {
                    let leaf_page = *path.last().unwrap();
                    let mut bucket = self.read_bucket(leaf_page)?;
                    let leaf = bucket.as_leaf_mut().ok_or_else(|| {
                        IndexError::corruption("search path did not end at a leaf")
                    })?;
                    let removed = leaf.remove(idx as usize, rid);
                    if removed {
                        self.write_bucket(leaf_page, &bucket, op)?;
                    }
                    removed
                }
            }
        };
        if removed {
            self.bump_tree_size(op, -1)?;
        }
        Ok(removed)
    }

    // ---- split --------------------------------------------------------

    /// Splits the overflowing node at the end of `path`, propagating the
    /// promoted separator upward (recursively splitting ancestors) as far
    /// as necessary.
    fn split_chain(&self, op: &WriteOp, path: &[u32]) -> IndexResult<()> {
        if path.len() == 1 {
            return self.split_root(op);
        }
        let node_page = path[path.len() - 1];
        let (sep_raw, right_page) = self.split_node(op, node_page)?;
        let sep_key = self.codec.deserialize(&sep_raw)?;
        self.insert_separator(op, &sep_key, sep_raw, node_page, right_page)
    }

    /// Splits a non-root leaf or internal bucket in place, allocating a new
    /// right sibling. Returns the promoted separator and the new page id.
    fn split_node(&self, op: &WriteOp, page_id: u32) -> IndexResult<(Vec<u8>, u32)> {
        match self.read_bucket(page_id)? {
            Bucket::Leaf(mut leaf) => {
                let mid = leaf.size() / 2;
                let sep_raw = leaf.get_raw_key(mid).to_vec();
                let right_entries = leaf.entries_from(mid);
                let old_right_sibling = leaf.right_sibling;
                leaf.shrink(mid);

                let right_page = self.cache.add_page()?;
                let mut right = LeafBucket::new_empty();
                right.add_all(right_entries);
                right.left_sibling = page_id;
                right.right_sibling = old_right_sibling;
                leaf.right_sibling = right_page;

                if old_right_sibling != NONE_PAGE {
                    if let Bucket::Leaf(mut sibling) = self.read_bucket(old_right_sibling)? {
                        sibling.left_sibling = right_page;
                        self.write_page_bytes(old_right_sibling, sibling.encode()?, op)?;
                    }
                }
                self.write_page_bytes(page_id, leaf.encode()?, op)?;
                self.write_page_bytes(right_page, right.encode()?, op)?;
                Ok((sep_raw, right_page))
            }
            Bucket::Internal(mut internal) => {
                let mid = internal.size() / 2;
                let sep_raw = internal.get_raw_key(mid).to_vec();
                let right_entries = internal.entries_from(mid + 1);
                let old_right_sibling = internal.right_sibling;
                internal.shrink(mid);

                let right_page = self.cache.add_page()?;
                let mut right = InternalBucket::new_empty();
                right.add_all(right_entries);
                right.left_sibling = page_id;
                right.right_sibling = old_right_sibling;
                internal.right_sibling = right_page;

                if old_right_sibling != NONE_PAGE {
                    if let Bucket::Internal(mut sibling) = self.read_bucket(old_right_sibling)? {
                        sibling.left_sibling = right_page;
                        self.write_page_bytes(old_right_sibling, sibling.encode()?, op)?;
                    }
                }
                self.write_page_bytes(page_id, internal.encode()?, op)?;
                self.write_page_bytes(right_page, right.encode()?, op)?;
                Ok((sep_raw, right_page))
            }
        }
    }

    /// Special-cased root split: the root page must stay page 0, so both
    /// halves move to fresh pages and the root is rewritten in place as an
    /// internal bucket with one separator entry.
    fn split_root(&self, op: &WriteOp) -> IndexResult<()> {
        match self.read_bucket(ROOT_PAGE)? {
            Bucket::Leaf(leaf) => {
                let mid = leaf.size() / 2;
                let sep_raw = leaf.get_raw_key(mid).to_vec();
                let left_entries = leaf.entries_before(mid);
                let right_entries = leaf.entries_from(mid);
                let tree_size = leaf.tree_size;

                let left_page = self.cache.add_page()?;
                let right_page = self.cache.add_page()?;
                let mut l = LeafBucket::new_empty();
                l.add_all(left_entries);
                l.right_sibling = right_page;
                let mut r = LeafBucket::new_empty();
                r.add_all(right_entries);
                r.left_sibling = left_page;
                self.write_page_bytes(left_page, l.encode()?, op)?;
                self.write_page_bytes(right_page, r.encode()?, op)?;

                let mut new_root = InternalBucket::new_empty();
                new_root.tree_size = tree_size;
                new_root.add_non_leaf_entry(0, sep_raw, left_page, right_page, false);
                self.write_page_bytes(ROOT_PAGE, new_root.encode()?, op)
            }
            Bucket::Internal(internal) => {
                let mid = internal.size() / 2;
                let sep_raw = internal.get_raw_key(mid).to_vec();
                let left_entries = internal.entries_before(mid);
                let right_entries = internal.entries_from(mid + 1);
                let tree_size = internal.tree_size;

                let left_page = self.cache.add_page()?;
                let right_page = self.cache.add_page()?;
                let mut l = InternalBucket::new_empty();
                l.add_all(left_entries);
                l.right_sibling = right_page;
                let mut r = InternalBucket::new_empty();
                r.add_all(right_entries);
                r.left_sibling = left_page;
                self.write_page_bytes(left_page, l.encode()?, op)?;
                self.write_page_bytes(right_page, r.encode()?, op)?;

                let mut new_root = InternalBucket::new_empty();
                new_root.tree_size = tree_size;
                new_root.add_non_leaf_entry(0, sep_raw, left_page, right_page, false);
                self.write_page_bytes(ROOT_PAGE, new_root.encode()?, op)
            }
        }
    }

    /// Inserts a promoted separator into its parent, recursively splitting
    /// ancestors (and retrying) until it fits.
    fn insert_separator(
        &self,
        op: &WriteOp,
        sep_key: &Key,
        sep_raw: Vec<u8>,
        left_child: u32,
        right_child: u32,
    ) -> IndexResult<()> {
        let path_to_parent = self.path_to_parent_of(sep_key, left_child)?;
        let parent_page = *path_to_parent.last().unwrap();

        let mut parent_bucket = self.read_bucket(parent_page)?;
        let inserted = {
            let parent = parent_bucket
                .as_internal_mut()
                .ok_or_else(|| IndexError::corruption("parent is not an internal bucket"))?;
            let find_res = parent.find(sep_key, &self.codec)?;
            let i = if find_res >= 0 {
                find_res as usize
            } else {
                (-find_res - 1) as usize
            };
            parent.add_non_leaf_entry(i, sep_raw.clone(), left_child, right_child, true)
        };

        if inserted {
            return self.write_bucket(parent_page, &parent_bucket, op);
        }

        if parent_page == ROOT_PAGE {
            self.split_root(op)?;
        } else {
            self.split_chain(op, &path_to_parent)?;
        }
        self.insert_separator(op, sep_key, sep_raw, left_child, right_child)
    }

    // ---- lifecycle ------------------------------------------------------

    pub fn clear(&self) -> IndexResult<()> {
        let op = self.lock.begin_write()?;
        self.cache.truncate(1)?;
        self.write_page_bytes(ROOT_PAGE, LeafBucket::new_empty().encode()?, &op)?;
        if self.null_file.is_some() {
            self.write_null_bucket(&NullBucket::new_empty())?;
        }
        op.commit()
    }

    pub fn flush(&self) -> IndexResult<()> {
        self.cache.flush()?;
        if let Some(f) = &self.null_file {
            f.sync()?;
        }
        Ok(())
    }

    pub fn close(&self) -> IndexResult<()> {
        self.flush()
    }

    /// Flushes, then removes the backing files from disk.
    pub fn delete(self) -> IndexResult<()> {
        self.flush()?;
        std::fs::remove_file(&self.main_path)?;
        std::fs::remove_file(wal_path_for(&self.main_path))?;
        if let Some(p) = &self.null_path {
            std::fs::remove_file(p)?;
        }
        Ok(())
    }
}

fn wal_path_for(main_path: &Path) -> PathBuf {
    let mut wal = main_path.as_os_str().to_os_string();
    wal.push(".wal");
    PathBuf::from(wal)
}
