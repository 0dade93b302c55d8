// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sqd list`: print registered accessions, five per line.

use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::Args;
use sqd_sources::CONTAINER_KEYS;
use sqd_storage::Register;
use std::path::Path;

#[derive(Args)]
pub struct ListArgs {
    /// List only the datasets from the given source
    #[arg(short, long, value_parser = PossibleValuesParser::new(CONTAINER_KEYS))]
    pub source: Option<String>,

    /// List only accessions matching at least one regular expression
    #[arg(short, long, num_args = 1.., default_values_t = [String::new()])]
    pub regular_expressions: Vec<String>,
}

pub fn run(args: &ListArgs, location: &Path) -> Result<()> {
    let patterns = super::compile_patterns(&args.regular_expressions);
    let register = Register::load_from_dir(location, &CONTAINER_KEYS)?;

    let containers: Vec<String> = match &args.source {
        Some(source) => vec![source.clone()],
        None => register.container_names().map(String::from).collect(),
    };
    for container in containers {
        let accessions = register.filter_accessions(&container, &patterns);
        if accessions.is_empty() {
            continue;
        }
        println!("- {container}:");
        for chunk in accessions.chunks(5) {
            println!("{}", chunk.join("\t"));
        }
    }
    Ok(())
}
