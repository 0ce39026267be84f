//! CLI command definitions and dispatch.

pub mod exec;
pub mod ps;
pub mod run;
pub mod stop;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cage_common::config::RuntimeDirs;

/// cage — minimal container runtime.
#[derive(Parser, Debug)]
#[command(name = "cage", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding the registry and cgroup state.
    #[arg(long, global = true, env = "CAGE_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Directory holding the network and cgroup helper scripts.
    #[arg(long, global = true, env = "CAGE_HELPER_DIR")]
    pub helper_dir: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create and start a container.
    Run(run::RunArgs),
    /// List running containers.
    Ps(ps::PsArgs),
    /// Stop a running container.
    Stop(stop::StopArgs),
    /// Execute a command inside a running container.
    Exec(exec::ExecArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let mut dirs = cli
        .state_dir
        .map_or_else(RuntimeDirs::default, RuntimeDirs::new);
    if let Some(helper_dir) = cli.helper_dir {
        dirs = dirs.with_helper_dir(helper_dir);
    }
    match cli.command {
        Command::Run(args) => run::execute(&dirs, args),
        Command::Ps(args) => ps::execute(&dirs, args),
        Command::Stop(args) => stop::execute(&dirs, args),
        Command::Exec(args) => exec::execute(&dirs, args),
    }
}
