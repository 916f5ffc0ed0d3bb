use thiserror::Error;

use super::allocator::Handle;

/// Errors returned by the allocator operations. None of them
/// leave the ledger in a modified state: an operation either
/// completes or fails before touching any block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// A size of zero was given to `initialize`, `reset` or
    /// `allocate`.
    #[error("Invalid size: sizes must be greater than zero.")]
    InvalidSize,
    /// No free block is large enough for the request. The
    /// request might still succeed after a compaction if
    /// `available` is at least `requested`.
    #[error("Out of memory: requested {requested} bytes, {available} available (largest free block: {largest_free}).")]
    OutOfMemory {
        requested: usize,
        available: usize,
        largest_free: usize,
    },
    /// The handle does not match the start of an allocated
    /// block (double free, interior or foreign address).
    #[error("Invalid handle: no allocated block starts at offset {}.", .0.offset())]
    InvalidHandle(Handle),
}

pub type Result<T> = std::result::Result<T, AllocError>;
