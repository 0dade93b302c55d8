// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sqd init`: create the register directory.

use anyhow::Result;
use clap::Args;
use sqd_sources::CONTAINER_KEYS;
use sqd_storage::{create_register, Register};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct InitArgs {
    /// Force reconstruction of the register
    #[arg(short, long)]
    pub force: bool,

    /// Init the local register from a register file
    #[arg(short, long)]
    pub register_file: Option<PathBuf>,
}

pub fn run(args: &InitArgs, location: &Path) -> Result<()> {
    tracing::info!("init register");
    create_register(location, &CONTAINER_KEYS, args.force)?;

    if let Some(file) = &args.register_file {
        let register = Register::load_from_file(file, &CONTAINER_KEYS)?;
        register.save_to_dir(location)?;
    }
    tracing::info!("created at location {}", location.display());
    Ok(())
}
