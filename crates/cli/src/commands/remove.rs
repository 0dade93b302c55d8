// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sqd remove`: delete accessions matching patterns from the register.

use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::Args;
use sqd_sources::CONTAINER_KEYS;
use sqd_storage::Register;
use std::path::Path;

#[derive(Args)]
pub struct RemoveArgs {
    /// Delete only from the given source; all sources when omitted
    #[arg(short, long, value_parser = PossibleValuesParser::new(CONTAINER_KEYS))]
    pub source: Option<String>,

    /// Accessions to remove; each may be a regular expression
    #[arg(short, long, num_args = 1.., required = true)]
    pub accessions: Vec<String>,
}

pub fn run(args: &RemoveArgs, location: &Path) -> Result<()> {
    let patterns = super::compile_patterns(&args.accessions);
    let mut register = Register::load_from_dir(location, &CONTAINER_KEYS)?;

    let containers: Vec<String> = match &args.source {
        Some(source) => vec![source.clone()],
        None => register.container_names().map(String::from).collect(),
    };
    for container in containers {
        for acc in register.filter_accessions(&container, &patterns) {
            if register.remove_accession(&container, &acc) {
                tracing::info!("accession {acc} removed from {container}");
            }
        }
    }
    register.save_to_dir(location)?;
    Ok(())
}
