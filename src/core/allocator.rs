mod compaction;
mod ledger;
mod memory;
mod strategy;

use log::*;

use super::arena::Arena;
use super::error::{AllocError, Result};
use ledger::Ledger;

pub use compaction::{Compaction, Relocation};
pub use memory::{Block, BlockState};
pub use strategy::{ParseStrategyError, Strategy};

/// Address of an allocated block, as handed out to callers. It
/// is the offset of the block from the start of the arena, so a
/// handle stays meaningful only until the next compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(usize);

impl Handle {
    pub fn new(offset: usize) -> Self {
        Self(offset)
    }

    pub fn offset(self) -> usize {
        self.0
    }
}

/// Summary of the ledger, computed in a single pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Total number of allocated bytes.
    pub allocated_size: usize,
    /// Number of allocated blocks.
    pub allocated_chunks: usize,
    /// Total number of free bytes.
    pub free_size: usize,
    /// Number of free blocks.
    pub free_chunks: usize,
    /// Length of the largest free block, or 0 without any.
    pub largest_free: usize,
    /// Length of the smallest free block, or 0 without any.
    pub smallest_free: usize,
}

/// Contiguous-memory allocator: a fixed-size arena, the ledger
/// of blocks partitioning it and the strategy used to place new
/// allocations.
pub struct Allocator {
    /// Bytes being managed.
    arena: Arena,
    /// Free and allocated blocks covering the arena.
    ledger: Ledger,
    /// How free blocks are picked for new allocations.
    strategy: Strategy,
}

impl Allocator {
    /// Creates an allocator managing an arena of `size` bytes,
    /// initially a single free block.
    pub fn new(size: usize, strategy: Strategy) -> Result<Self> {
        if size == 0 {
            return Err(AllocError::InvalidSize);
        }

        info!("Initialized a {size} byte arena ({strategy}).");

        Ok(Self {
            arena: Arena::new(size),
            ledger: Ledger::new(size),
            strategy,
        })
    }

    /// Drops the arena and the ledger and starts over with a new
    /// arena. On error the allocator is left as it was.
    pub fn reset(&mut self, size: usize, strategy: Strategy) -> Result<()> {
        *self = Self::new(size, strategy)?;
        Ok(())
    }

    /// Releases the arena and every block record.
    pub fn teardown(self) {
        info!(
            "Tore down a {} byte arena ({} blocks).",
            self.size(),
            self.ledger.len()
        );
    }

    pub fn size(&self) -> usize {
        self.ledger.size()
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Address of the first byte of the arena. Adding a handle's
    /// offset to it gives the address of the block.
    pub fn base(&self) -> *const u8 {
        self.arena.as_ptr()
    }

    /// Blocks of the ledger, in offset order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.ledger.blocks()
    }

    pub fn allocate(&mut self, size: usize) -> Result<Handle> {
        if size == 0 {
            return Err(AllocError::InvalidSize);
        }

        // Selecting the block only reads the ledger, so a failed
        // request leaves everything untouched.
        let Some(id) = self.strategy.select(&self.ledger, size) else {
            let statistics = self.statistics();
            debug!("Failed to allocate {size} bytes ({} available).", statistics.free_size);

            return Err(AllocError::OutOfMemory {
                requested: size,
                available: statistics.free_size,
                largest_free: statistics.largest_free,
            });
        };

        let offset = self.ledger.allocate(id, size);
        debug_assert!(self.ledger.is_consistent());
        debug!("Allocated {size} bytes at offset {offset}.");

        Ok(Handle(offset))
    }

    pub fn release(&mut self, handle: Handle) -> Result<()> {
        let id = self
            .ledger
            .find_allocated(handle.offset())
            .ok_or(AllocError::InvalidHandle(handle))?;

        self.ledger.release(id);
        debug_assert!(self.ledger.is_consistent());
        debug!("Released the block at offset {}.", handle.offset());

        Ok(())
    }

    /// Number of free bytes, whether contiguous or not.
    pub fn available(&self) -> usize {
        self.ledger
            .free_blocks()
            .map(|(_, block)| block.length)
            .sum()
    }

    pub fn statistics(&self) -> Statistics {
        let mut statistics = Statistics::default();

        for block in self.ledger.blocks() {
            match block.state {
                BlockState::Allocated => {
                    statistics.allocated_size += block.length;
                    statistics.allocated_chunks += 1;
                }
                BlockState::Free => {
                    // The smallest free size starts at 0 like the
                    // others, so the first free block always sets
                    // it.
                    if statistics.free_chunks == 0 || block.length < statistics.smallest_free {
                        statistics.smallest_free = block.length;
                    }
                    statistics.largest_free = statistics.largest_free.max(block.length);
                    statistics.free_size += block.length;
                    statistics.free_chunks += 1;
                }
            }
        }

        statistics
    }

    /// Moves every allocated block to the lowest offsets, keeping
    /// their order, and gathers the free space at the end of the
    /// arena. The contents of the blocks follow them; handles
    /// issued before the call must be translated with the
    /// returned compaction.
    pub fn compact(&mut self) -> Compaction {
        // The ledger first works out where every block goes, then
        // the bytes are moved accordingly.
        let compaction = self.ledger.compact();
        self.arena.relocate(&compaction);
        debug_assert!(self.ledger.is_consistent());

        info!(
            "Compacted {} blocks ({} moved), {} bytes free at the end.",
            compaction.blocks,
            compaction.relocations.len(),
            self.available()
        );

        compaction
    }

    /// Contents of the allocated block at `handle`.
    pub fn bytes(&self, handle: Handle) -> Result<&[u8]> {
        let id = self
            .ledger
            .find_allocated(handle.offset())
            .ok_or(AllocError::InvalidHandle(handle))?;

        Ok(self.arena.slice(handle.offset(), self.ledger.block(id).length))
    }

    pub fn bytes_mut(&mut self, handle: Handle) -> Result<&mut [u8]> {
        let id = self
            .ledger
            .find_allocated(handle.offset())
            .ok_or(AllocError::InvalidHandle(handle))?;

        let length = self.ledger.block(id).length;
        Ok(self.arena.slice_mut(handle.offset(), length))
    }

    /// Whether the ledger still partitions the arena properly.
    pub fn is_consistent(&self) -> bool {
        self.ledger.is_consistent() && self.arena.size() == self.ledger.size()
    }
}
