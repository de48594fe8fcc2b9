//! C5: forward and backward range cursors with batched prefetch, plus an
//! ascending cursor over distinct keys.

use std::cmp::Ordering;
use std::collections::VecDeque;

use crate::bucket::NONE_PAGE;
use crate::error::IndexResult;
use crate::key::Key;
use crate::page_cache::PageCache;
use crate::rid::Rid;
use crate::tree::Tree;

/// Where a range-cursor walk currently sits: a leaf page plus the entry and
/// RID indices of the *next* value to emit. `Exhausted` once the bound is
/// crossed or the sibling chain runs out.
enum Position {
    Leaf { page: u32, entry: i64, rid: i64 },
    Exhausted,
}

/// A forward or backward range cursor over `(key, rid)` pairs.
pub struct RangeCursor<'a, C: PageCache> {
    tree: &'a Tree<C>,
    ascending: bool,
    low: Option<Key>,
    low_incl: bool,
    high: Option<Key>,
    high_incl: bool,
    position: Position,
    prefetch_size: usize,
    queue: VecDeque<(Key, Rid)>,
}

impl<'a, C: PageCache> RangeCursor<'a, C> {
    pub(crate) fn new(
        tree: &'a Tree<C>,
        low: Option<Key>,
        low_incl: bool,
        high: Option<Key>,
        high_incl: bool,
        ascending: bool,
        prefetch_size: usize,
    ) -> IndexResult<Self> {
        let prefetch_size = tree.config().clamp_prefetch(prefetch_size);
        let _guard = tree.lock_for_read()?;

        let position = if ascending {
            let (page, idx) = match &low {
                Some(k) => {
                    let (path, idx) = tree.find_bucket(k)?;
                    (*path.last().unwrap(), idx)
                }
                None => (tree.leftmost_leaf()?, -1),
            };
            let entry = match &low {
                Some(_) => {
                    if idx >= 0 {
                        if low_incl {
                            idx
                        } else {
                            idx + 1
                        }
                    } else {
                        -idx - 1
                    }
                }
                None => 0,
            };
            Position::Leaf { page, entry, rid: 0 }
        } else {
            let (page, idx) = match &high {
                Some(k) => {
                    let (path, idx) = tree.find_bucket(k)?;
                    (*path.last().unwrap(), idx)
                }
                None => {
                    let page = tree.rightmost_leaf()?;
                    (page, i64::MIN)
                }
            };
            let entry = match &high {
                Some(_) => {
                    if idx >= 0 {
                        if high_incl {
                            idx
                        } else {
                            idx - 1
                        }
                    } else {
                        -idx - 1 - 1
                    }
                }
                None => {
                    let bucket = tree.read_bucket(page)?;
                    let size = bucket.as_leaf().map(|l| l.size()).unwrap_or(0);
                    size as i64 - 1
                }
            };
            Position::Leaf { page, entry, rid: -1 }
        };

        Ok(Self {
            tree,
            ascending,
            low,
            low_incl,
            high,
            high_incl,
            position,
            prefetch_size,
            queue: VecDeque::new(),
        })
    }

    /// Returns the next `(key, rid)` pair, transparently refilling the
    /// in-memory batch (taken under one read-lock acquisition) when empty.
    pub fn next(&mut self) -> IndexResult<Option<(Key, Rid)>> {
        if let Some(item) = self.queue.pop_front() {
            return Ok(Some(item));
        }
        self.refill()?;
        Ok(self.queue.pop_front())
    }

    fn refill(&mut self) -> IndexResult<()> {
        let _guard = self.tree.lock_for_read()?;
        for _ in 0..self.prefetch_size {
            match self.step()? {
                Some(item) => self.queue.push_back(item),
                None => break,
            }
        }
        Ok(())
    }

    fn step(&mut self) -> IndexResult<Option<(Key, Rid)>> {
        loop {
            let (page, entry, rid_idx) = match self.position {
                Position::Exhausted => return Ok(None),
                Position::Leaf { page, entry, rid } => (page, entry, rid),
            };

            let bucket = self.tree.read_bucket(page)?;
            let leaf = match bucket.as_leaf() {
                Some(l) => l,
                None => {
                    self.position = Position::Exhausted;
                    return Ok(None);
                }
            };

            if self.ascending {
                if entry < 0 || entry as usize >= leaf.size() {
                    self.position = match leaf.right_sibling {
                        NONE_PAGE => Position::Exhausted,
                        next => Position::Leaf {
                            page: next,
                            entry: 0,
                            rid: 0,
                        },
                    };
                    continue;
                }
            } else if entry < 0 {
                self.position = match leaf.left_sibling {
                    NONE_PAGE => Position::Exhausted,
                    next => {
                        let sib = self.tree.read_bucket(next)?;
                        let size = sib.as_leaf().map(|l| l.size()).unwrap_or(0);
                        Position::Leaf {
                            page: next,
                            entry: size as i64 - 1,
                            rid: -1,
                        }
                    }
                };
                continue;
            }

            let entry_idx = entry as usize;
            let key = leaf.get_key(entry_idx, self.tree.codec())?;

            if !self.within_bounds(&key) {
                self.position = Position::Exhausted;
                return Ok(None);
            }

            let rids = leaf.get_values(entry_idx);
            let rid_pos = if self.ascending {
                rid_idx
            } else if rid_idx < 0 {
                rids.len() as i64 - 1
            } else {
                rid_idx
            };

            if rid_pos < 0 || rid_pos as usize >= rids.len() {
                self.position = if self.ascending {
                    Position::Leaf {
                        page,
                        entry: entry + 1,
                        rid: 0,
                    }
                } else {
                    Position::Leaf {
                        page,
                        entry: entry - 1,
                        rid: -1,
                    }
                };
                continue;
            }

            let rid = rids[rid_pos as usize];
            self.position = if self.ascending {
                Position::Leaf {
                    page,
                    entry,
                    rid: rid_pos + 1,
                }
            } else {
                Position::Leaf {
                    page,
                    entry,
                    rid: rid_pos - 1,
                }
            };
            return Ok(Some((key, rid)));
        }
    }

    fn within_bounds(&self, key: &Key) -> bool {
        if self.ascending {
            if let Some(high) = &self.high {
                let cmp = key.cmp(high);
                let fail = if self.high_incl {
                    cmp == Ordering::Greater
                } else {
                    cmp != Ordering::Less
                };
                if fail {
                    return false;
                }
            }
        } else if let Some(low) = &self.low {
            let cmp = key.cmp(low);
            let fail = if self.low_incl {
                cmp == Ordering::Less
            } else {
                cmp != Ordering::Greater
            };
            if fail {
                return false;
            }
        }
        true
    }
}

/// Ascending cursor over every distinct stored key, emitted once each
/// regardless of how many RIDs it carries.
pub struct KeyCursor<'a, C: PageCache> {
    tree: &'a Tree<C>,
    page: u32,
    entry: usize,
}

impl<'a, C: PageCache> KeyCursor<'a, C> {
    pub(crate) fn new(tree: &'a Tree<C>) -> IndexResult<Self> {
        let _guard = tree.lock_for_read()?;
        let page = tree.leftmost_leaf()?;
        Ok(Self { tree, page, entry: 0 })
    }

    pub fn next(&mut self) -> IndexResult<Option<Key>> {
        let _guard = self.tree.lock_for_read()?;
        loop {
            if self.page == NONE_PAGE {
                return Ok(None);
            }
            let bucket = self.tree.read_bucket(self.page)?;
            let leaf = match bucket.as_leaf() {
                Some(l) => l,
                None => return Ok(None),
            };
            if self.entry >= leaf.size() {
                self.page = leaf.right_sibling;
                self.entry = 0;
                continue;
            }
            let key = leaf.get_key(self.entry, self.tree.codec())?;
            self.entry += 1;
            return Ok(Some(key));
        }
    }
}
