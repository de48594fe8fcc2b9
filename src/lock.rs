//! C6: tree-level shared/exclusive lock plus the per-write atomic-operation
//! envelope.
//!
//! Simplified from the teacher's `ConcurrentStatus` wait-for-graph deadlock
//! detector: the tree rules out concurrent writers entirely, so there is
//! nothing to detect a deadlock between -- one `RwLock<()>` orders readers
//! against the single writer, and every write is wrapped in a
//! start/commit-or-abort WAL envelope via `WriteOp`'s `Drop`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::IndexResult;
use crate::wal::WalWriter;

pub struct TreeLock {
    rw: RwLock<()>,
    next_op_id: AtomicU64,
    wal: WalWriter,
}

impl TreeLock {
    pub fn new(wal: WalWriter) -> Self {
        Self {
            rw: RwLock::new(()),
            next_op_id: AtomicU64::new(1),
            wal,
        }
    }

    /// Acquires the tree shared lock for a read. Released when the guard
    /// drops.
    pub fn begin_read(&self) -> IndexResult<ReadGuard<'_>> {
        let guard = self.rw.read().unwrap();
        Ok(ReadGuard { _guard: guard })
    }

    /// Begins an atomic write operation: logs `START`, then acquires the
    /// tree exclusive lock. The caller must call `commit` on success; if the
    /// returned `WriteOp` drops without a commit, `ABORT` is logged.
    pub fn begin_write(&self) -> IndexResult<WriteOp<'_>> {
        let op_id = self.next_op_id.fetch_add(1, Ordering::SeqCst);
        self.wal.log_start(op_id)?;
        let guard = self.rw.write().unwrap();
        Ok(WriteOp {
            _guard: guard,
            op_id,
            wal: &self.wal,
            committed: false,
        })
    }
}

pub struct ReadGuard<'a> {
    _guard: RwLockReadGuard<'a, ()>,
}

pub struct WriteOp<'a> {
    _guard: RwLockWriteGuard<'a, ()>,
    op_id: u64,
    wal: &'a WalWriter,
    committed: bool,
}

impl<'a> WriteOp<'a> {
    pub fn op_id(&self) -> u64 {
        self.op_id
    }

    pub fn log_page_update(&self, page_id: u32) -> IndexResult<()> {
        self.wal.log_update(self.op_id, page_id)
    }

    pub fn commit(mut self) -> IndexResult<()> {
        self.wal.log_commit(self.op_id)?;
        self.committed = true;
        Ok(())
    }
}

impl<'a> Drop for WriteOp<'a> {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = self.wal.log_abort(self.op_id) {
                log::error!("failed to log abort for op {}: {}", self.op_id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncommitted_write_op_logs_abort_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let lock = TreeLock::new(WalWriter::open(dir.path().join("wal.log")).unwrap());
        {
            let _op = lock.begin_write().unwrap();
        }
        {
            let op = lock.begin_write().unwrap();
            op.commit().unwrap();
        }
    }
}
