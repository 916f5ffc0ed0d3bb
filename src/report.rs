use std::fmt;

use crate::core::allocator::{Allocator, BlockState, Compaction, Statistics};

// Line-oriented report, one figure per line.
impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Allocated size = {}", self.allocated_size)?;
        writeln!(f, "Allocated chunks = {}", self.allocated_chunks)?;
        writeln!(f, "Free size = {}", self.free_size)?;
        writeln!(f, "Free chunks = {}", self.free_chunks)?;
        writeln!(f, "Largest free chunk size = {}", self.largest_free)?;
        write!(f, "Smallest free chunk size = {}", self.smallest_free)
    }
}

/// Displays the blocks of an allocator, one per line, as
/// `[start, end) state (length bytes)`.
pub struct BlockMap<'a>(pub &'a Allocator);

impl fmt::Display for BlockMap<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, block) in self.0.blocks().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }

            let state = match block.state {
                BlockState::Free => "free",
                BlockState::Allocated => "allocated",
            };
            write!(
                f,
                "[{}, {}) {} ({} bytes)",
                block.offset,
                block.end(),
                state,
                block.length
            )?;
        }

        Ok(())
    }
}

/// Displays the relocations of a compaction as `before -> after`
/// pairs, followed by the number of blocks processed.
pub struct Relocations<'a>(pub &'a Compaction);

impl fmt::Display for Relocations<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for relocation in &self.0.relocations {
            writeln!(
                f,
                "{} -> {} ({} bytes)",
                relocation.before.offset(),
                relocation.after.offset(),
                relocation.length
            )?;
        }

        write!(
            f,
            "Compacted {} blocks, {} moved",
            self.0.blocks,
            self.0.relocations.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::allocator::Strategy;

    #[test]
    fn statistics_report() {
        let statistics = Statistics {
            allocated_size: 35,
            allocated_chunks: 2,
            free_size: 65,
            free_chunks: 3,
            largest_free: 50,
            smallest_free: 5,
        };

        assert_eq!(
            statistics.to_string(),
            "Allocated size = 35\n\
             Allocated chunks = 2\n\
             Free size = 65\n\
             Free chunks = 3\n\
             Largest free chunk size = 50\n\
             Smallest free chunk size = 5"
        );
    }

    #[test]
    fn block_map_and_relocations() {
        let mut allocator = Allocator::new(64, Strategy::FirstFit).unwrap();
        let a = allocator.allocate(16).unwrap();
        allocator.allocate(8).unwrap();
        allocator.release(a).unwrap();

        assert_eq!(
            BlockMap(&allocator).to_string(),
            "[0, 16) free (16 bytes)\n\
             [16, 24) allocated (8 bytes)\n\
             [24, 64) free (40 bytes)"
        );

        let compaction = allocator.compact();
        assert_eq!(
            Relocations(&compaction).to_string(),
            "16 -> 0 (8 bytes)\nCompacted 1 blocks, 1 moved"
        );
    }
}
