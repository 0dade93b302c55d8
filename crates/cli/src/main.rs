// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sqd: prepare reproducible sequence datasets.
//!
//! Maintain a register of accessions grouped by source, then download every
//! referenced artifact with the dependency-aware job engine.

mod commands;
mod exit_error;

use clap::{Parser, Subcommand};
use exit_error::ExitError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sqd",
    version,
    about = "Prepare a sequence dataset, download it and export .reg files for reproducibility."
)]
struct Cli {
    /// Directory that stores all info for the register
    #[arg(long, global = true, default_value = ".register")]
    register_location: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialise the data register
    Init(commands::init::InitArgs),
    /// Add dataset(s) to manage
    Add(commands::add::AddArgs),
    /// Download data from the register
    Download(commands::download::DownloadArgs),
    /// Export the register into a .reg file loadable elsewhere
    Export(commands::export::ExportArgs),
    /// List the datasets from the register
    List(commands::list::ListArgs),
    /// Remove dataset(s) from the register
    Remove(commands::remove::RemoveArgs),
    /// Run a staging payload in this process (spawned by the engine)
    #[command(name = "payload-worker", hide = true)]
    PayloadWorker { payload: String },
}

fn main() {
    if cfg!(windows) {
        eprintln!("Windows platforms are not supported by sqd.");
        std::process::exit(3);
    }

    let cli = Cli::parse();

    // Worker re-entry: the parent engine owns the log file this process
    // writes to, so skip logger setup and dispatch straight away.
    if let Command::PayloadWorker { payload } = &cli.command {
        std::process::exit(sqd_core::payload::worker_main(payload));
    }

    init_tracing();

    if let Err(err) = run(cli) {
        if !err.message.is_empty() {
            eprintln!("{err}");
        }
        std::process::exit(err.code);
    }
}

#[tokio::main]
async fn run(cli: Cli) -> Result<(), ExitError> {
    let location = &cli.register_location;

    // Everything except init needs an existing register.
    if !matches!(cli.command, Command::Init(_)) && !location.is_dir() {
        return Err(ExitError::new(1, "No data register found. Please first run the init command."));
    }

    match cli.command {
        Command::Init(args) => commands::init::run(&args, location)?,
        Command::Add(args) => commands::add::run(&args, location).await?,
        Command::Download(args) => commands::download::run(&args, location).await?,
        Command::Export(args) => commands::export::run(&args, location)?,
        Command::List(args) => commands::list::run(&args, location)?,
        Command::Remove(args) => commands::remove::run(&args, location)?,
        Command::PayloadWorker { .. } => {}
    }
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
