//! Small command language to drive an allocator from a text
//! script, one command per line:
//!
//! ```text
//!   alloc <size>         allocate, the handle goes to the next slot
//!   free <slot>          release the block held by a slot
//!   write <slot> <byte>  fill a block with a byte value
//!   check <slot> <byte>  fail unless a block only holds that value
//!   compact              compact, then remap every live slot
//!   available            print the number of free bytes
//!   stats                print the allocator statistics
//!   blocks               print the block map
//! ```
//!
//! Slots are numbered from 0 in the order of the `alloc`
//! commands, including failed ones. Everything after a `#` is a
//! comment.

use std::{io::Write, str::FromStr};

use anyhow::{anyhow, bail, Context, Result};
use log::*;

use crate::{
    core::allocator::{Allocator, Handle},
    report::{BlockMap, Relocations},
};

/// Script run by the binary when no script file is given.
pub const DEMO: &str = "\
# Fragment the arena, then compact it.
alloc 30
alloc 20
alloc 10
write 0 0xAA
write 2 0xCC
free 1
blocks
stats
alloc 25
compact
blocks
check 0 0xAA
check 2 0xCC
alloc 25
stats
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Alloc(usize),
    Free(usize),
    Write { slot: usize, byte: u8 },
    Check { slot: usize, byte: u8 },
    Compact,
    Available,
    Stats,
    Blocks,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut words = s.split_whitespace();
        let name = words.next().ok_or_else(|| anyhow!("Empty command."))?;

        let mut argument = |what: &str| {
            words
                .next()
                .ok_or_else(|| anyhow!("'{name}' expects a {what}."))
        };

        let command = match name {
            "alloc" => Command::Alloc(parse_number(argument("size")?)?),
            "free" => Command::Free(parse_number(argument("slot")?)?),
            "write" => Command::Write {
                slot: parse_number(argument("slot")?)?,
                byte: parse_byte(argument("byte")?)?,
            },
            "check" => Command::Check {
                slot: parse_number(argument("slot")?)?,
                byte: parse_byte(argument("byte")?)?,
            },
            "compact" => Command::Compact,
            "available" => Command::Available,
            "stats" => Command::Stats,
            "blocks" => Command::Blocks,
            _ => bail!("Unknown command '{name}'."),
        };

        if let Some(extra) = words.next() {
            bail!("Unexpected argument '{extra}' for '{name}'.");
        }

        Ok(command)
    }
}

fn parse_number(word: &str) -> Result<usize> {
    word.parse::<usize>()
        .with_context(|| format!("Invalid number '{word}'."))
}

fn parse_byte(word: &str) -> Result<u8> {
    let parsed = match word.strip_prefix("0x").or_else(|| word.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => word.parse::<u8>(),
    };

    parsed.with_context(|| format!("Invalid byte value '{word}'."))
}

/// Parses a whole script, skipping blank lines and comments.
pub fn parse(source: &str) -> Result<Vec<Command>> {
    source
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let line = line.split('#').next().unwrap_or_default().trim();
            (!line.is_empty()).then_some((index + 1, line))
        })
        .map(|(number, line)| {
            line.parse::<Command>()
                .with_context(|| format!("Line {number}: '{line}'"))
        })
        .collect()
}

/// Allocator plus the handles obtained by a script so far.
pub struct Session {
    allocator: Allocator,
    /// Handle held by each slot, `None` once released (or when
    /// the allocation failed).
    slots: Vec<Option<Handle>>,
}

impl Session {
    pub fn new(allocator: Allocator) -> Self {
        Self {
            allocator,
            slots: Vec::new(),
        }
    }

    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    pub fn slot(&self, slot: usize) -> Option<Handle> {
        self.slots.get(slot).copied().flatten()
    }

    pub fn into_allocator(self) -> Allocator {
        self.allocator
    }

    pub fn run(&mut self, commands: &[Command], out: &mut impl Write) -> Result<()> {
        for command in commands {
            self.execute(*command, out)
                .with_context(|| format!("Failed to run {command:?}"))?;
        }

        Ok(())
    }

    pub fn execute(&mut self, command: Command, out: &mut impl Write) -> Result<()> {
        match command {
            Command::Alloc(size) => {
                let slot = self.slots.len();

                // A failed allocation is a normal outcome for the
                // script: the slot stays empty and the run goes on.
                match self.allocator.allocate(size) {
                    Ok(handle) => {
                        writeln!(out, "#{slot} = alloc {size} -> offset {}", handle.offset())?;
                        self.slots.push(Some(handle));
                    }
                    Err(error) => {
                        warn!("Allocation #{slot} failed: {error}");
                        writeln!(out, "#{slot} = alloc {size} -> failed: {error}")?;
                        self.slots.push(None);
                    }
                }
            }
            Command::Free(slot) => {
                let handle = self.live_slot(slot)?;
                self.allocator.release(handle)?;
                self.slots[slot] = None;
                writeln!(out, "free #{slot}")?;
            }
            Command::Write { slot, byte } => {
                let handle = self.live_slot(slot)?;
                self.allocator.bytes_mut(handle)?.fill(byte);
                writeln!(out, "write #{slot} {byte:#04x}")?;
            }
            Command::Check { slot, byte } => {
                let handle = self.live_slot(slot)?;
                let bytes = self.allocator.bytes(handle)?;

                if let Some(position) = bytes.iter().position(|&value| value != byte) {
                    bail!(
                        "Slot #{slot} holds {:#04x} at byte {position}, expected {byte:#04x}.",
                        bytes[position]
                    );
                }
                writeln!(out, "check #{slot} {byte:#04x} ok")?;
            }
            Command::Compact => {
                let compaction = self.allocator.compact();

                // Every handle held by the script is stale now.
                for handle in self.slots.iter_mut().flatten() {
                    *handle = compaction.remap(*handle);
                }
                writeln!(out, "{}", Relocations(&compaction))?;
            }
            Command::Available => {
                writeln!(out, "Available = {}", self.allocator.available())?;
            }
            Command::Stats => {
                writeln!(out, "{}", self.allocator.statistics())?;
            }
            Command::Blocks => {
                writeln!(out, "{}", BlockMap(&self.allocator))?;
            }
        }

        Ok(())
    }

    fn live_slot(&self, slot: usize) -> Result<Handle> {
        match self.slots.get(slot) {
            Some(Some(handle)) => Ok(*handle),
            Some(None) => Err(anyhow!("Slot #{slot} holds no block.")),
            None => Err(anyhow!("Slot #{slot} does not exist.")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::allocator::Strategy;

    fn session(size: usize, strategy: Strategy) -> Session {
        Session::new(Allocator::new(size, strategy).unwrap())
    }

    #[test]
    fn parses_commands_and_skips_comments() {
        let commands = parse("# header\n\nalloc 30\nfree 0 # done\nwrite 1 0xff\ncheck 1 255\ncompact\n").unwrap();

        assert_eq!(
            commands,
            vec![
                Command::Alloc(30),
                Command::Free(0),
                Command::Write { slot: 1, byte: 0xFF },
                Command::Check { slot: 1, byte: 255 },
                Command::Compact,
            ]
        );
    }

    #[test]
    fn parse_errors_name_the_line() {
        let error = parse("alloc 10\nalloc ten\n").unwrap_err();
        assert!(format!("{error:#}").contains("Line 2"));

        assert!(parse("allocate 10").is_err());
        assert!(parse("free").is_err());
        assert!(parse("stats now").is_err());
        assert!(parse("write 0 0x100").is_err());
    }

    #[test]
    fn failed_allocations_take_a_slot() {
        let mut session = session(16, Strategy::FirstFit);
        let mut out = Vec::new();

        session
            .run(&parse("alloc 20\nalloc 8").unwrap(), &mut out)
            .unwrap();

        assert_eq!(session.slot(0), None);
        assert_eq!(session.slot(1), Some(Handle::new(0)));
        assert!(String::from_utf8(out).unwrap().contains("#0 = alloc 20 -> failed"));
    }

    #[test]
    fn freeing_twice_is_an_error() {
        let mut session = session(16, Strategy::FirstFit);
        let mut out = Vec::new();

        session.run(&parse("alloc 8\nfree 0").unwrap(), &mut out).unwrap();
        assert!(session.execute(Command::Free(0), &mut out).is_err());
        assert!(session.execute(Command::Free(7), &mut out).is_err());
    }

    #[test]
    fn compaction_remaps_slots() {
        let mut session = session(100, Strategy::FirstFit);
        let mut out = Vec::new();

        session
            .run(
                &parse("alloc 10\nalloc 10\nalloc 10\nwrite 2 7\nfree 1\ncompact\ncheck 2 7").unwrap(),
                &mut out,
            )
            .unwrap();

        assert_eq!(session.slot(0), Some(Handle::new(0)));
        assert_eq!(session.slot(2), Some(Handle::new(10)));
        assert_eq!(session.allocator().available(), 80);
    }

    #[test]
    fn check_reports_mismatches() {
        let mut session = session(32, Strategy::BestFit);
        let mut out = Vec::new();

        session.run(&parse("alloc 4\nwrite 0 1").unwrap(), &mut out).unwrap();
        assert!(session.execute(Command::Check { slot: 0, byte: 2 }, &mut out).is_err());
    }

    #[test]
    fn demo_script_runs() {
        let mut session = session(100, Strategy::FirstFit);
        let mut out = Vec::new();

        session.run(&parse(DEMO).unwrap(), &mut out).unwrap();

        let allocator = session.into_allocator();
        assert!(allocator.is_consistent());
        assert_eq!(allocator.statistics().allocated_chunks, 4);
    }
}
