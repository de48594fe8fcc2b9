//! Positioned-I/O access to a page-structured file.
//!
//! Mirrors the disk-manager half of a buffer pool: `read_at`/`write_at`
//! rather than a shared file cursor, so reads and writes never race each
//! other over `seek`.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::config::PAGE_SIZE;
use crate::error::IndexResult;

pub struct PageFile {
    file: File,
    next_page_id: AtomicU32,
}

impl PageFile {
    pub fn create(path: impl AsRef<Path>) -> IndexResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            file,
            next_page_id: AtomicU32::new(0),
        })
    }

    pub fn open(path: impl AsRef<Path>) -> IndexResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let next_page_id = (file.metadata()?.len() / PAGE_SIZE as u64) as u32;
        Ok(Self {
            file,
            next_page_id: AtomicU32::new(next_page_id),
        })
    }

    pub fn read_page(&self, page_id: u32, buf: &mut [u8; PAGE_SIZE]) -> IndexResult<()> {
        let offset = page_id as u64 * PAGE_SIZE as u64;
        self.file.read_exact_at(buf, offset)?;
        Ok(())
    }

    pub fn write_page(&self, page_id: u32, buf: &[u8; PAGE_SIZE]) -> IndexResult<()> {
        let offset = page_id as u64 * PAGE_SIZE as u64;
        self.file.write_all_at(buf, offset)?;
        Ok(())
    }

    /// Reserves the next page id and grows the backing file to cover it.
    pub fn allocate_page(&self) -> IndexResult<u32> {
        let page_id = self.next_page_id.fetch_add(1, Ordering::SeqCst);
        let zeros = [0u8; PAGE_SIZE];
        self.write_page(page_id, &zeros)?;
        Ok(page_id)
    }

    pub fn filled_up_to(&self) -> u32 {
        self.next_page_id.load(Ordering::SeqCst)
    }

    pub fn truncate(&self, num_pages: u32) -> IndexResult<()> {
        self.file.set_len(num_pages as u64 * PAGE_SIZE as u64)?;
        self.next_page_id.store(num_pages, Ordering::SeqCst);
        Ok(())
    }

    pub fn sync(&self) -> IndexResult<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocated_pages_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let pf = PageFile::create(dir.path().join("data")).unwrap();
        let pid = pf.allocate_page().unwrap();
        let mut buf = [7u8; PAGE_SIZE];
        pf.write_page(pid, &buf).unwrap();
        let mut out = [0u8; PAGE_SIZE];
        pf.read_page(pid, &mut out).unwrap();
        buf.iter().zip(out.iter()).for_each(|(a, b)| assert_eq!(a, b));
    }

    #[test]
    fn reopen_picks_up_where_it_left_off() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data");
        {
            let pf = PageFile::create(&path).unwrap();
            pf.allocate_page().unwrap();
            pf.allocate_page().unwrap();
        }
        let pf = PageFile::open(&path).unwrap();
        assert_eq!(pf.filled_up_to(), 2);
    }
}
