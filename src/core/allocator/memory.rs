/// Allocation state of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    /// The block is available for allocation.
    Free,
    /// The block is handed out to a caller.
    Allocated,
}

impl BlockState {
    pub fn is_free(self) -> bool {
        self == BlockState::Free
    }
}

/// Contiguous region of the arena tracked by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Offset of the block within the arena, in bytes.
    pub offset: usize,
    /// Length of the block in bytes, never zero.
    pub length: usize,
    /// Whether the block is free or allocated.
    pub state: BlockState,
}

impl Block {
    pub fn new(offset: usize, length: usize, state: BlockState) -> Self {
        Self { offset, length, state }
    }

    /// Offset of the first byte after the block.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn is_free(&self) -> bool {
        self.state.is_free()
    }
}

/// Unique identifier of a block record within the ledger.
/// Identifiers are never reused, so a stale id simply misses
/// in the record map.
pub type BlockId = u64;

/// Ledger record: a block plus the links to its neighbours in
/// offset order.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlockNode {
    pub block: Block,
    pub prev: Option<BlockId>,
    pub next: Option<BlockId>,
}
