//! Simulator of a contiguous-memory allocator.
//!
//! A single fixed-size arena is partitioned into blocks, each
//! either free or allocated, tracked by a ledger that always
//! covers the whole arena:
//!
//! ```text
//!   0          30      50      60                        100
//!   ┌──────────┬───────┬───────┬──────────────────────────┐
//!   │ allocated│ free  │ alloc │           free           │
//!   └──────────┴───────┴───────┴──────────────────────────┘
//! ```
//!
//! New allocations are carved from a free block chosen by a
//! placement strategy (first, best or worst fit), released
//! blocks merge with their free neighbours, and compaction
//! slides every allocated block down so the free space ends up
//! in a single block at the end of the arena.
//!
//! ```rust
//! use blockledger::{Allocator, Strategy};
//!
//! let mut allocator = Allocator::new(100, Strategy::FirstFit).unwrap();
//! let a = allocator.allocate(10).unwrap();
//! let b = allocator.allocate(10).unwrap();
//! allocator.release(a).unwrap();
//!
//! // Handles issued before a compaction must be remapped.
//! let compaction = allocator.compact();
//! let b = compaction.remap(b);
//! assert_eq!(b.offset(), 0);
//! assert_eq!(allocator.available(), 90);
//! ```

pub mod config;
pub mod core;
pub mod report;
pub mod script;

pub use crate::core::{
    allocator::{Allocator, Block, BlockState, Compaction, Handle, Relocation, Statistics, Strategy},
    error::AllocError,
};
