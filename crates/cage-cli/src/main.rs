//! # cage — minimal container runtime CLI
//!
//! Single binary for creating, listing, stopping, and entering containers
//! built on Linux namespaces, `pivot_root`, and cgroups.

mod commands;

use clap::Parser;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::execute(cli)
}
