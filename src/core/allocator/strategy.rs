use std::{fmt, str::FromStr};

use thiserror::Error;

use super::ledger::Ledger;
use super::memory::BlockId;

/// Placement strategy used to pick the free block an allocation
/// is carved from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// First free block, in offset order, that is large enough.
    #[default]
    FirstFit,
    /// Free block leaving the smallest remainder.
    BestFit,
    /// Free block leaving the largest remainder.
    WorstFit,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::FirstFit, Strategy::BestFit, Strategy::WorstFit];

    /// Selects the free block to allocate `size` bytes from, or
    /// `None` if no free block is large enough. This only reads
    /// the ledger: committing the allocation is up to the
    /// caller.
    pub(crate) fn select(self, ledger: &Ledger, size: usize) -> Option<BlockId> {
        // Every strategy only looks at free blocks that can hold
        // the request at all; they differ in which one of those
        // they keep.
        let mut candidates = ledger
            .free_blocks()
            .filter(|(_, block)| block.length >= size)
            .map(|(id, block)| (id, block.length - size));

        match self {
            Strategy::FirstFit => candidates.next().map(|(id, _)| id),
            Strategy::BestFit => keep_best(candidates, |leftover, best| leftover < best),
            Strategy::WorstFit => keep_best(candidates, |leftover, best| leftover > best),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Strategy::FirstFit => "first-fit",
            Strategy::BestFit => "best-fit",
            Strategy::WorstFit => "worst-fit",
        }
    }
}

/// Scans all the candidates (in offset order) and keeps the one
/// for which `better` holds against every other. Only a strictly
/// better leftover replaces the current pick, so ties go to the
/// earliest block. The scan starts without any pick rather than
/// with a size-based bound, so any candidate can win.
fn keep_best(
    candidates: impl Iterator<Item = (BlockId, usize)>,
    better: impl Fn(usize, usize) -> bool,
) -> Option<BlockId> {
    candidates
        .fold(None, |best: Option<(BlockId, usize)>, (id, leftover)| match best {
            Some((_, best_leftover)) if !better(leftover, best_leftover) => best,
            _ => Some((id, leftover)),
        })
        .map(|(id, _)| id)
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown placement strategy '{0}' (expected first-fit, best-fit or worst-fit).")]
pub struct ParseStrategyError(pub String);

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "first-fit" | "first" => Ok(Strategy::FirstFit),
            "best-fit" | "best" => Ok(Strategy::BestFit),
            "worst-fit" | "worst" => Ok(Strategy::WorstFit),
            _ => Err(ParseStrategyError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a ledger from consecutive allocations of `sizes`,
    /// then frees the blocks starting at `free`.
    fn ledger(size: usize, sizes: &[usize], free: &[usize]) -> Ledger {
        let mut ledger = Ledger::new(size);
        for &size in sizes {
            let id = Strategy::FirstFit.select(&ledger, size).unwrap();
            ledger.allocate(id, size);
        }
        for &offset in free {
            let id = ledger.find_allocated(offset).unwrap();
            ledger.release(id);
        }
        ledger
    }

    /// 100-byte ledger with free blocks of length 10 at 0, 40 at
    /// 30 and 15 at 75, separated by allocated blocks.
    fn fragmented() -> Ledger {
        ledger(100, &[10, 20, 40, 5, 15, 10], &[0, 30, 75])
    }

    fn selected_offset(strategy: Strategy, ledger: &Ledger, size: usize) -> Option<usize> {
        strategy.select(ledger, size).map(|id| ledger.block(id).offset)
    }

    #[test]
    fn first_fit_takes_the_lowest_offset() {
        let ledger = fragmented();

        assert_eq!(selected_offset(Strategy::FirstFit, &ledger, 5), Some(0));
        assert_eq!(selected_offset(Strategy::FirstFit, &ledger, 11), Some(30));
    }

    #[test]
    fn best_fit_takes_the_tightest_block() {
        let ledger = fragmented();

        assert_eq!(selected_offset(Strategy::BestFit, &ledger, 12), Some(75));
        assert_eq!(selected_offset(Strategy::BestFit, &ledger, 10), Some(0));
        assert_eq!(selected_offset(Strategy::BestFit, &ledger, 16), Some(30));
    }

    #[test]
    fn worst_fit_takes_the_largest_block() {
        let ledger = fragmented();

        assert_eq!(selected_offset(Strategy::WorstFit, &ledger, 1), Some(30));
        assert_eq!(selected_offset(Strategy::WorstFit, &ledger, 40), Some(30));
    }

    #[test]
    fn ties_go_to_the_lowest_offset() {
        // Two free blocks of length 10, at 0 and 15.
        let ledger = ledger(50, &[10, 5, 10, 5, 20], &[0, 15]);

        assert_eq!(selected_offset(Strategy::BestFit, &ledger, 10), Some(0));
        assert_eq!(selected_offset(Strategy::WorstFit, &ledger, 5), Some(0));
    }

    #[test]
    fn leftover_equal_to_request_is_accepted() {
        // A 20-byte free block for a 10-byte request leaves a
        // remainder equal to the request itself.
        let mut ledger = Ledger::new(30);
        let id = Strategy::FirstFit.select(&ledger, 10).unwrap();
        ledger.allocate(id, 10);

        for strategy in Strategy::ALL {
            assert_eq!(selected_offset(strategy, &ledger, 10), Some(10));
        }
    }

    #[test]
    fn no_candidate_without_room() {
        let ledger = fragmented();

        for strategy in Strategy::ALL {
            assert_eq!(strategy.select(&ledger, 41), None);
        }
    }

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("first-fit".parse(), Ok(Strategy::FirstFit));
        assert_eq!("Best_Fit".parse(), Ok(Strategy::BestFit));
        assert_eq!("worst".parse(), Ok(Strategy::WorstFit));
        assert!("next-fit".parse::<Strategy>().is_err());

        for strategy in Strategy::ALL {
            assert_eq!(strategy.to_string().parse(), Ok(strategy));
        }
    }
}
