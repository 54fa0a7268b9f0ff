// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Command line trace converter
//!
//! Routes are selected by file suffix: NDJSON-looking inputs are converted
//! to text, binary trace inputs to the format named by the output suffix
//! (`.txt` for text, `.asm` for an assembly listing, NDJSON otherwise).
//! Inputs and outputs may be compressed or tar-wrapped. Without `--out`,
//! the converted lines go to stdout; diagnostics always go to stderr.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use cbp_trace::convert::{self, FileSpec, Plan};

/// Convert CBP instruction traces between binary, text, assembly and NDJSON
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Input trace file
    #[arg(long = "in", value_name = "PATH")]
    input: PathBuf,

    /// Output file; writes to stdout if omitted
    #[arg(long = "out", value_name = "PATH")]
    output: Option<PathBuf>,

    /// Stop after this many pieces (0 = unlimited)
    #[arg(long, value_name = "N", default_value_t = 0)]
    limit: u64,

    /// Treat the input as a raw (optionally compressed) byte stream
    #[arg(long)]
    raw: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let plan = Plan {
        input: FileSpec::parse(&args.input),
        output: args.output.as_ref().map(FileSpec::parse),
        limit: args.limit,
        raw: args.raw,
    };

    let route = plan.route()?;
    let emitted = convert::convert(&plan)
        .with_context(|| format!("could not convert {}", args.input.display()))?;
    eprintln!("{}={emitted}", route.emitted_label());
    Ok(())
}
