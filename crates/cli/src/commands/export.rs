// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sqd export`: write the register into a versioned .reg file.

use anyhow::Result;
use clap::Args;
use sqd_sources::CONTAINER_KEYS;
use sqd_storage::Register;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct ExportArgs {
    /// Name of the register file; prefer .reg terminated filenames
    #[arg(short, long, default_value = "myregister.reg")]
    pub output_register: PathBuf,
}

pub fn run(args: &ExportArgs, location: &Path) -> Result<()> {
    let register = Register::load_from_dir(location, &CONTAINER_KEYS)?;
    register.save_to_file(&args.output_register)?;
    tracing::info!("register exported to {}", args.output_register.display());
    Ok(())
}
