// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sqd add`: validate accessions and add them to the register.

use anyhow::{bail, Context, Result};
use clap::builder::PossibleValuesParser;
use clap::Args;
use sqd_sources::{adapter_for, SourceContext, SourceOptions, CONTAINER_KEYS};
use sqd_storage::Register;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct AddArgs {
    /// Download source
    #[arg(short, long, value_parser = PossibleValuesParser::new(CONTAINER_KEYS))]
    pub source: String,

    /// List of accessions to register
    #[arg(short, long, num_args = 1..)]
    pub accessions: Vec<String>,

    /// A file containing accessions to download, one per line
    #[arg(short, long)]
    pub file_of_accessions: Option<PathBuf>,

    /// Temporary directory to store and organize the downloaded files
    #[arg(short, long, default_value_os_t = super::default_tmp_dir())]
    pub tmp_directory: PathBuf,

    /// Download unitigs instead of contigs for logan accessions
    #[arg(long)]
    pub unitigs: bool,
}

pub async fn run(args: &AddArgs, location: &Path) -> Result<()> {
    if args.unitigs && args.source != "logan" {
        bail!("--unitigs is only available for the logan source");
    }

    // Gather candidates from the command line and the accession file.
    let mut candidates: BTreeSet<String> = args.accessions.iter().cloned().collect();
    if let Some(file) = &args.file_of_accessions {
        let contents = std::fs::read_to_string(file)
            .with_context(|| format!("cannot read {}", file.display()))?;
        candidates.extend(contents.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from));
    }
    if candidates.is_empty() {
        bail!("nothing to add: pass --accessions or --file-of-accessions");
    }

    let ctx = SourceContext {
        tmp_dir: args.tmp_directory.clone(),
        bin_dir: location.join("bin"),
    };
    let opts = SourceOptions { logan_unitigs: args.unitigs };
    let adapter = adapter_for(&args.source, &ctx, &opts)
        .await
        .with_context(|| format!("unknown source {}", args.source))?;

    let valid = adapter.filter_valid(candidates.into_iter().collect()).await;

    let mut register = Register::load_from_dir(location, &CONTAINER_KEYS)?;
    let added = register.add(&args.source, valid);
    register.save_to_dir(location)?;

    tracing::info!("{added} accessions added to the register");
    Ok(())
}
