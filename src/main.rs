use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use virodyn::manager::Manager;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    /// Simulation directory containing `config.toml`.
    #[arg(long)]
    sim_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a new run and perform all of its trials.
    Create,

    /// Average the trials of every run.
    Analyze,

    /// Remove every run.
    Clean,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mgr = Manager::new(args.sim_dir).context("failed to construct mgr")?;

    match args.command {
        Command::Create => {
            let run_dir = mgr.create_run().context("failed to create run")?;
            log::info!("finished {run_dir:?}");
        }
        Command::Analyze => mgr.analyze_sim().context("failed to analyze sim")?,
        Command::Clean => mgr.clean_sim().context("failed to clean sim")?,
    }

    Ok(())
}
