use super::allocator::Compaction;

/// Fixed-size byte buffer managed by an allocator. The arena
/// knows nothing about blocks: it only hands out byte ranges
/// and moves bytes around when told to.
pub struct Arena {
    bytes: Box<[u8]>,
}

impl Arena {
    /// Creates a zero-filled arena of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size].into_boxed_slice(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    pub fn slice(&self, offset: usize, length: usize) -> &[u8] {
        &self.bytes[offset..offset + length]
    }

    pub fn slice_mut(&mut self, offset: usize, length: usize) -> &mut [u8] {
        &mut self.bytes[offset..offset + length]
    }

    /// Moves the contents of every relocated block to its new
    /// offset. Relocations are in ascending offset order and
    /// always move bytes down, so each copy only overwrites
    /// bytes that were already moved or that belong to free
    /// space.
    pub fn relocate(&mut self, compaction: &Compaction) {
        for relocation in &compaction.relocations {
            let source = relocation.before.offset();
            let destination = relocation.after.offset();
            debug_assert!(destination < source);

            // The source and destination ranges may overlap when
            // a block moves by less than its own length, which
            // `copy_within` handles.
            self.bytes
                .copy_within(source..source + relocation.length, destination);
        }
    }
}
