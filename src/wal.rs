//! A5: the atomic-operation envelope's write-ahead log.
//!
//! A minimal append-only record stream -- `START`/`UPDATE`/`COMMIT`/`ABORT`
//! -- giving every write an audit trail and an all-or-nothing outcome. This
//! does not implement ARIES redo/undo recovery scanning on reopen; recovery
//! from a half-written log is left to the embedding system, the way the
//! spec's atomic-operation manager is specified only by its contract.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::error::IndexResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    Start = 0,
    Update = 1,
    Commit = 2,
    Abort = 3,
}

/// Appends fixed-shape records: `[type:u8][op_id:u64][page_id:u32]`.
/// `page_id` is `u32::MAX` for records that don't name a page.
pub struct WalWriter {
    file: Mutex<File>,
}

const NO_PAGE: u32 = u32::MAX;

impl WalWriter {
    pub fn open(path: impl AsRef<Path>) -> IndexResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    fn append(&self, record_type: RecordType, op_id: u64, page_id: u32) -> IndexResult<()> {
        let mut buf = Vec::with_capacity(13);
        buf.push(record_type as u8);
        buf.extend_from_slice(&op_id.to_be_bytes());
        buf.extend_from_slice(&page_id.to_be_bytes());
        let mut file = self.file.lock().unwrap();
        file.write_all(&buf)?;
        if record_type == RecordType::Commit || cfg!(feature = "aries_force") {
            file.sync_data()?;
        }
        Ok(())
    }

    pub fn log_start(&self, op_id: u64) -> IndexResult<()> {
        log::debug!("wal: start op={}", op_id);
        self.append(RecordType::Start, op_id, NO_PAGE)
    }

    pub fn log_update(&self, op_id: u64, page_id: u32) -> IndexResult<()> {
        log::debug!("wal: update op={} page={}", op_id, page_id);
        self.append(RecordType::Update, op_id, page_id)
    }

    pub fn log_commit(&self, op_id: u64) -> IndexResult<()> {
        log::debug!("wal: commit op={}", op_id);
        self.append(RecordType::Commit, op_id, NO_PAGE)
    }

    pub fn log_abort(&self, op_id: u64) -> IndexResult<()> {
        log::debug!("wal: abort op={}", op_id);
        self.append(RecordType::Abort, op_id, NO_PAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let wal = WalWriter::open(dir.path().join("wal.log")).unwrap();
        wal.log_start(1).unwrap();
        wal.log_update(1, 3).unwrap();
        wal.log_commit(1).unwrap();

        let len = std::fs::metadata(dir.path().join("wal.log")).unwrap().len();
        assert_eq!(len, 13 * 3);
    }
}
