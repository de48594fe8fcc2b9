//! Error type for the index core.
//!
//! Follows the hand-rolled `SimpleError` pattern rather than pulling in a
//! derive-macro crate: a small fixed set of variants, manual `Display`, and
//! an optional captured backtrace for the cases an operator will actually
//! want a stack for (corruption, I/O).

use std::fmt;
use std::io;

use backtrace::Backtrace;

/// Errors raised by tree operations.
///
/// Every variant maps to one of the error kinds in the specification:
/// `IOFailure`, `KeyTooBig`, `NullKeyDisallowed`, `Corruption`, and
/// `OperationOnNonAggregable`. The tree has no lock timeout: cancellation
/// and timeouts are explicitly out of scope at this level, inherited from
/// whatever the page cache and I/O layer below it decide to do.
#[derive(Debug)]
pub enum IndexError {
    /// Wraps an I/O error from the page cache or backing file. Causes the
    /// enclosing atomic operation to roll back.
    Io(io::Error),

    /// A serialized key exceeded `Config::max_key_size`. Raised before any
    /// page is mutated.
    KeyTooBig { actual: usize, max: usize },

    /// A null key was passed to a tree that was created without null-key
    /// support.
    NullKeyDisallowed,

    /// A structural invariant was violated: path depth exceeded
    /// `Config::max_depth`, a child pointer led nowhere, or a bucket failed
    /// its own consistency check. The index should be rebuilt.
    Corruption(String),

    /// The caller asked for an operation the tree configuration does not
    /// support, e.g. a composite-key boundary query against a
    /// single-field tree.
    OperationOnNonAggregable(String),
}

impl IndexError {
    pub fn corruption(msg: impl Into<String>) -> Self {
        let err = IndexError::Corruption(msg.into());
        log::error!("{}\n{:?}", err, Backtrace::new());
        err
    }

    pub fn key_too_big(actual: usize, max: usize) -> Self {
        IndexError::KeyTooBig { actual, max }
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::Io(e) => write!(f, "index I/O failure: {}", e),
            IndexError::KeyTooBig { actual, max } => write!(
                f,
                "serialized key is {} bytes, exceeds max_key_size of {}",
                actual, max
            ),
            IndexError::NullKeyDisallowed => {
                write!(f, "null key given but this tree has no null-key support")
            }
            IndexError::Corruption(msg) => {
                write!(f, "index corruption, rebuild recommended: {}", msg)
            }
            IndexError::OperationOnNonAggregable(msg) => {
                write!(f, "operation not supported by this tree: {}", msg)
            }
        }
    }
}

impl std::error::Error for IndexError {}

impl From<io::Error> for IndexError {
    fn from(e: io::Error) -> Self {
        IndexError::Io(e)
    }
}

pub type IndexResult<T> = Result<T, IndexError>;
