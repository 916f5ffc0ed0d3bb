use super::Handle;

/// Move of one allocated block during a compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    /// Handle of the block before the compaction (now stale).
    pub before: Handle,
    /// Handle of the block after the compaction.
    pub after: Handle,
    /// Number of bytes to move.
    pub length: usize,
}

/// Outcome of a compaction: how many allocated blocks were
/// walked, and the before/after handles of those that moved,
/// in offset order. Blocks that were already in place are
/// counted but not listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compaction {
    pub blocks: usize,
    pub relocations: Vec<Relocation>,
}

impl Compaction {
    /// Old handles of the moved blocks, positionally matching
    /// `after()`.
    pub fn before(&self) -> impl Iterator<Item = Handle> + '_ {
        self.relocations.iter().map(|relocation| relocation.before)
    }

    /// New handles of the moved blocks, positionally matching
    /// `before()`.
    pub fn after(&self) -> impl Iterator<Item = Handle> + '_ {
        self.relocations.iter().map(|relocation| relocation.after)
    }

    /// Translates a handle issued before the compaction into the
    /// handle valid after it. Handles of blocks that did not move
    /// are returned unchanged.
    pub fn remap(&self, handle: Handle) -> Handle {
        // Relocations are sorted by their old offset.
        self.relocations
            .binary_search_by_key(&handle, |relocation| relocation.before)
            .map(|index| self.relocations[index].after)
            .unwrap_or(handle)
    }

    pub fn is_noop(&self) -> bool {
        self.relocations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compaction() -> Compaction {
        Compaction {
            blocks: 3,
            relocations: vec![
                Relocation {
                    before: Handle::new(20),
                    after: Handle::new(10),
                    length: 5,
                },
                Relocation {
                    before: Handle::new(40),
                    after: Handle::new(15),
                    length: 8,
                },
            ],
        }
    }

    #[test]
    fn remap_translates_moved_handles() {
        let compaction = compaction();

        assert_eq!(compaction.remap(Handle::new(20)), Handle::new(10));
        assert_eq!(compaction.remap(Handle::new(40)), Handle::new(15));
        assert_eq!(compaction.remap(Handle::new(0)), Handle::new(0));
    }

    #[test]
    fn before_and_after_are_positional() {
        let compaction = compaction();

        let pairs: Vec<_> = compaction.before().zip(compaction.after()).collect();
        assert_eq!(
            pairs,
            vec![
                (Handle::new(20), Handle::new(10)),
                (Handle::new(40), Handle::new(15)),
            ]
        );
        assert!(!compaction.is_noop());
        assert!(Compaction::default().is_noop());
    }
}
