use anyhow::{anyhow, Result};

use crate::core::allocator::{Allocator, Strategy};

/// Size of the arena when none is configured: 1 KiB.
pub const DEFAULT_ARENA_SIZE: usize = 1024;

/// Largest arena accepted from the configuration: 1 GiB.
pub const MAX_ARENA_SIZE: usize = 1 << 30;

/// Settings an allocator is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Size of the arena in bytes.
    pub size: usize,
    /// Placement strategy for new allocations.
    pub strategy: Strategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            size: DEFAULT_ARENA_SIZE,
            strategy: Strategy::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(anyhow!("The arena size must be greater than zero."));
        }
        if self.size > MAX_ARENA_SIZE {
            return Err(anyhow!(
                "The arena size ({} bytes) exceeds the maximum of {} bytes.",
                self.size,
                MAX_ARENA_SIZE
            ));
        }

        Ok(())
    }

    /// Validates the settings and creates the allocator.
    pub fn build(&self) -> Result<Allocator> {
        self.validate()?;
        Ok(Allocator::new(self.size, self.strategy)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds() {
        let allocator = Config::default().build().unwrap();

        assert_eq!(allocator.size(), DEFAULT_ARENA_SIZE);
        assert_eq!(allocator.strategy(), Strategy::FirstFit);
    }

    #[test]
    fn out_of_range_sizes_are_rejected() {
        for size in [0, MAX_ARENA_SIZE + 1] {
            let config = Config {
                size,
                strategy: Strategy::BestFit,
            };
            assert!(config.validate().is_err());
            assert!(config.build().is_err());
        }
    }
}
