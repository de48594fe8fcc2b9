//! The page-cache contract the tree is built against, plus a reference
//! file-backed implementation.
//!
//! Grounded in the teacher's `PageCache`: pages are kept behind
//! `Arc<RwLock<_>>` handles so a reader and a writer never observe a torn
//! page, and callers pair every `load_for_*` with a `release`. Unlike the
//! teacher's buffer pool this cache never evicts a resident page -- there is
//! no multi-table working set to bound here, only one tree's pages -- so
//! `release` only matters for the write-back-on-release bookkeeping, not for
//! reclaiming memory.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock as StdRwLock;

use crate::config::PAGE_SIZE;
use crate::disk::PageFile;
use crate::error::IndexResult;
use crate::util::{pod, Pod};

pub struct Page {
    pub bytes: [u8; PAGE_SIZE],
    pub dirty: bool,
}

impl Page {
    pub fn zeroed() -> Self {
        Self {
            bytes: [0u8; PAGE_SIZE],
            dirty: false,
        }
    }
}

/// The storage-layer dependency a tree is built against: allocate pages,
/// load them for shared or exclusive access, release them, and flush.
pub trait PageCache: Send + Sync {
    /// Allocates a new zero-filled page and returns its id.
    fn add_page(&self) -> IndexResult<u32>;

    fn load_for_read(&self, page_id: u32) -> IndexResult<Pod<Page>>;

    fn load_for_write(&self, page_id: u32) -> IndexResult<Pod<Page>>;

    /// Releases a page previously returned by `load_for_read`/`load_for_write`.
    /// Writes the page back to the file immediately if it was marked dirty.
    fn release(&self, page_id: u32) -> IndexResult<()>;

    /// Drops a page from the cache without writing it back, for rollback.
    fn discard(&self, page_id: u32);

    fn filled_up_to(&self) -> u32;

    fn truncate(&self, num_pages: u32) -> IndexResult<()>;

    /// Writes every dirty resident page back to the file and fsyncs it.
    fn flush(&self) -> IndexResult<()>;
}

/// Single-file, single-tree page cache: a write-through `HashMap` of
/// resident pages over a `PageFile`.
pub struct FilePageCache {
    file: PageFile,
    buffer: StdRwLock<HashMap<u32, Pod<Page>>>,
}

impl FilePageCache {
    pub fn create(path: impl AsRef<Path>) -> IndexResult<Self> {
        Ok(Self {
            file: PageFile::create(path)?,
            buffer: StdRwLock::new(HashMap::new()),
        })
    }

    pub fn open(path: impl AsRef<Path>) -> IndexResult<Self> {
        Ok(Self {
            file: PageFile::open(path)?,
            buffer: StdRwLock::new(HashMap::new()),
        })
    }

    fn resident(&self, page_id: u32) -> IndexResult<Pod<Page>> {
        if let Some(page) = self.buffer.read().unwrap().get(&page_id) {
            return Ok(page.clone());
        }
        let mut bytes = [0u8; PAGE_SIZE];
        self.file.read_page(page_id, &mut bytes)?;
        let page = pod(Page {
            bytes,
            dirty: false,
        });
        self.buffer.write().unwrap().insert(page_id, page.clone());
        Ok(page)
    }
}

impl PageCache for FilePageCache {
    fn add_page(&self) -> IndexResult<u32> {
        let page_id = self.file.allocate_page()?;
        self.buffer
            .write()
            .unwrap()
            .insert(page_id, pod(Page::zeroed()));
        Ok(page_id)
    }

    fn load_for_read(&self, page_id: u32) -> IndexResult<Pod<Page>> {
        self.resident(page_id)
    }

    fn load_for_write(&self, page_id: u32) -> IndexResult<Pod<Page>> {
        self.resident(page_id)
    }

    fn release(&self, page_id: u32) -> IndexResult<()> {
        let page = match self.buffer.read().unwrap().get(&page_id) {
            Some(p) => p.clone(),
            None => return Ok(()),
        };
        let mut guard = page.write().unwrap();
        if guard.dirty {
            self.file.write_page(page_id, &guard.bytes)?;
            guard.dirty = false;
        }
        Ok(())
    }

    fn discard(&self, page_id: u32) {
        self.buffer.write().unwrap().remove(&page_id);
    }

    fn filled_up_to(&self) -> u32 {
        self.file.filled_up_to()
    }

    fn truncate(&self, num_pages: u32) -> IndexResult<()> {
        self.buffer
            .write()
            .unwrap()
            .retain(|pid, _| *pid < num_pages);
        self.file.truncate(num_pages)
    }

    fn flush(&self) -> IndexResult<()> {
        let resident: Vec<(u32, Pod<Page>)> = self
            .buffer
            .read()
            .unwrap()
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect();
        for (page_id, page) in resident {
            let mut guard = page.write().unwrap();
            if guard.dirty {
                self.file.write_page(page_id, &guard.bytes)?;
                guard.dirty = false;
            }
        }
        self.file.sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::HandyRwLock;

    #[test]
    fn written_page_survives_release_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FilePageCache::create(dir.path().join("data")).unwrap();
        let pid = cache.add_page().unwrap();

        {
            let page = cache.load_for_write(pid).unwrap();
            let mut guard = page.wl();
            guard.bytes[0] = 42;
            guard.dirty = true;
        }
        cache.release(pid).unwrap();
        cache.discard(pid);

        let page = cache.load_for_read(pid).unwrap();
        assert_eq!(page.rl().bytes[0], 42);
    }
}
