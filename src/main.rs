use std::{fs, io, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::*;

use blockledger::{
    config::{Config, DEFAULT_ARENA_SIZE},
    script::{self, Session},
    Strategy,
};

/// Runs an allocation script against a simulated arena.
#[derive(Parser)]
#[command(name = "blockledger")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Size of the arena in bytes
    #[arg(short, long, env = "BLOCKLEDGER_SIZE", default_value_t = DEFAULT_ARENA_SIZE)]
    size: usize,

    /// Placement strategy: first-fit, best-fit or worst-fit
    #[arg(short = 'S', long, env = "BLOCKLEDGER_STRATEGY", default_value_t = Strategy::FirstFit)]
    strategy: Strategy,

    /// Script to run (runs a built-in demonstration if omitted)
    script: Option<PathBuf>,
}

fn main() -> Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();

    let cli = Cli::parse();
    let config = Config {
        size: cli.size,
        strategy: cli.strategy,
    };

    let source = match &cli.script {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?,
        None => {
            info!("No script given, running the demonstration.");
            script::DEMO.to_string()
        }
    };
    let commands = script::parse(&source)?;

    let mut session = Session::new(config.build()?);
    session.run(&commands, &mut io::stdout().lock())?;

    session.into_allocator().teardown();
    Ok(())
}
