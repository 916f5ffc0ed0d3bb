use std::collections::HashMap;

use super::compaction::{Compaction, Relocation};
use super::memory::{Block, BlockId, BlockNode, BlockState};
use super::Handle;

/// Ordered list of the blocks covering an arena. Records live
/// in a map keyed by id and are linked to their neighbours
/// through `prev`/`next` ids, so splitting and merging blocks
/// never has to shift the other records around.
pub struct Ledger {
    /// Size of the arena the blocks partition.
    size: usize,
    /// Block records, linked in offset order.
    nodes: HashMap<BlockId, BlockNode>,
    /// Id of the block at offset 0.
    head: BlockId,
    /// Id handed out to the next created record.
    id_counter: BlockId,
}

impl Ledger {
    /// Creates a ledger with a single free block spanning the
    /// whole arena. The size must be non-zero.
    pub fn new(size: usize) -> Self {
        debug_assert!(size > 0);

        let id = 1;
        let nodes = HashMap::from([(
            id,
            BlockNode {
                block: Block::new(0, size, BlockState::Free),
                prev: None,
                next: None,
            },
        )]);

        Self {
            size,
            nodes,
            head: id,
            id_counter: id + 1,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of block records currently in the list.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Iterates over the blocks in offset order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            ledger: self,
            cursor: Some(self.head),
        }
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.iter().map(|(_, block)| block)
    }

    pub fn free_blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.iter().filter(|(_, block)| block.is_free())
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.node(id).block
    }

    /// Finds the allocated block starting exactly at `offset`.
    pub fn find_allocated(&self, offset: usize) -> Option<BlockId> {
        self.iter()
            .take_while(|(_, block)| block.offset <= offset)
            .find(|(_, block)| block.offset == offset && !block.is_free())
            .map(|(id, _)| id)
    }

    /// Turns the first `size` bytes of the free block `id` into
    /// an allocated block and returns its offset. The block must
    /// have been selected beforehand: it is free and at least
    /// `size` bytes long.
    pub fn allocate(&mut self, id: BlockId, size: usize) -> usize {
        let node = *self.node(id);
        debug_assert!(node.block.is_free() && node.block.length >= size && size > 0);

        // The allocation always starts at the beginning of the
        // free block: the front part becomes the allocated
        // block and whatever is left stays free behind it.
        let remainder = node.block.length - size;
        let allocated = self.node_mut(id);
        allocated.block.state = BlockState::Allocated;
        allocated.block.length = size;

        if remainder > 0 {
            let free_next = node.next.filter(|&next| self.block(next).is_free());

            match free_next {
                Some(next_id) => {
                    // The following block is already free, so the
                    // remainder is given to it rather than creating
                    // two adjacent free blocks.
                    let next = self.node_mut(next_id);
                    next.block.offset -= remainder;
                    next.block.length += remainder;
                }
                None => {
                    // Otherwise, the remainder becomes a new free
                    // block linked right after the allocated one.
                    let new_id = self.next_id();
                    self.nodes.insert(
                        new_id,
                        BlockNode {
                            block: Block::new(node.block.offset + size, remainder, BlockState::Free),
                            prev: Some(id),
                            next: node.next,
                        },
                    );

                    if let Some(next_id) = node.next {
                        self.node_mut(next_id).prev = Some(new_id);
                    }
                    self.node_mut(id).next = Some(new_id);
                }
            }
        }

        node.block.offset
    }

    /// Marks the allocated block `id` as free and merges it with
    /// its free neighbours.
    pub fn release(&mut self, id: BlockId) {
        debug_assert!(!self.block(id).is_free());
        self.node_mut(id).block.state = BlockState::Free;

        // Merge forward first: the released block absorbs its
        // successor and keeps its id, so the backward merge below
        // still sees the right record.
        let node = *self.node(id);
        if let Some(next_id) = node.next {
            if self.block(next_id).is_free() {
                self.merge(id, next_id);
            }
        }

        if let Some(prev_id) = node.prev {
            if self.block(prev_id).is_free() {
                self.merge(prev_id, id);
            }
        }
    }

    /// Slides every allocated block down to the lowest offsets,
    /// in order, and gathers all the free space in one block at
    /// the end of the arena. Only the ledger is updated: moving
    /// the bytes is left to the caller, following the returned
    /// relocations.
    pub fn compact(&mut self) -> Compaction {
        let mut frontier = 0;
        let mut blocks = 0;
        let mut relocations = Vec::new();

        let mut head = None;
        let mut last = None;
        let mut cursor = Some(self.head);

        while let Some(id) = cursor {
            let node = *self.node(id);
            cursor = node.next;

            // Free blocks are dropped entirely; their space is
            // accounted for by the tail block appended below.
            if node.block.is_free() {
                self.nodes.remove(&id);
                continue;
            }

            if node.block.offset > frontier {
                relocations.push(Relocation {
                    before: Handle::new(node.block.offset),
                    after: Handle::new(frontier),
                    length: node.block.length,
                });
            }

            let moved = self.node_mut(id);
            moved.block.offset = frontier;
            moved.prev = last;
            moved.next = None;

            match last {
                Some(last_id) => self.node_mut(last_id).next = Some(id),
                None => head = Some(id),
            }

            last = Some(id);
            frontier += node.block.length;
            blocks += 1;
        }

        // A full arena has no space left to reclaim, and a
        // zero-length tail block would break the ledger.
        if frontier < self.size {
            let tail = self.next_id();
            self.nodes.insert(
                tail,
                BlockNode {
                    block: Block::new(frontier, self.size - frontier, BlockState::Free),
                    prev: last,
                    next: None,
                },
            );

            match last {
                Some(last_id) => self.node_mut(last_id).next = Some(tail),
                None => head = Some(tail),
            }
        }

        self.head = head.unwrap_or_else(|| unreachable!("compaction emptied the ledger"));

        Compaction { blocks, relocations }
    }

    /// Checks that the blocks partition the arena exactly, that
    /// no block is empty, that no two free blocks are adjacent
    /// and that the links are symmetric.
    pub fn is_consistent(&self) -> bool {
        let mut expected_offset = 0;
        let mut prev: Option<BlockId> = None;
        let mut prev_free = false;
        let mut count = 0;
        let mut cursor = Some(self.head);

        while let Some(id) = cursor {
            let Some(node) = self.nodes.get(&id) else {
                return false;
            };

            count += 1;
            if count > self.nodes.len()
                || node.prev != prev
                || node.block.offset != expected_offset
                || node.block.length == 0
                || (prev_free && node.block.is_free())
            {
                return false;
            }

            expected_offset = node.block.end();
            prev_free = node.block.is_free();
            prev = Some(id);
            cursor = node.next;
        }

        expected_offset == self.size && count == self.nodes.len()
    }

    fn merge(&mut self, left: BlockId, right: BlockId) {
        // Remove the right block from the list, since it will
        // be absorbed by the left one.
        let right_node = self
            .nodes
            .remove(&right)
            .unwrap_or_else(|| unreachable!("dangling block link {right}"));

        let left_node = self.node_mut(left);
        left_node.block.length += right_node.block.length;
        left_node.next = right_node.next;

        // The block after the (merged) right one now points back
        // to the left block.
        if let Some(next_id) = right_node.next {
            self.node_mut(next_id).prev = Some(left);
        }
    }

    fn next_id(&mut self) -> BlockId {
        let id = self.id_counter;
        self.id_counter += 1;
        id
    }

    fn node(&self, id: BlockId) -> &BlockNode {
        self.nodes
            .get(&id)
            .unwrap_or_else(|| unreachable!("dangling block link {id}"))
    }

    fn node_mut(&mut self, id: BlockId) -> &mut BlockNode {
        self.nodes
            .get_mut(&id)
            .unwrap_or_else(|| unreachable!("dangling block link {id}"))
    }
}

/// Iterator over the blocks of a ledger, in offset order.
pub struct Iter<'a> {
    ledger: &'a Ledger,
    cursor: Option<BlockId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (BlockId, &'a Block);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let ledger = self.ledger;
        let node = ledger.node(id);
        self.cursor = node.next;
        Some((id, &node.block))
    }
}
