//! `cage run` — Create and start a container.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::Args;

use cage_common::config::RuntimeDirs;
use cage_common::types::ContainerOptions;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Detach the container and leave it running in the background.
    #[arg(short, long)]
    pub daemonize: bool,

    /// CPU share in percent (1-100; 100 means unrestricted).
    #[arg(long, default_value_t = 100)]
    pub cpu: u8,

    /// Give the container a private network with this IPv4 address.
    #[arg(long)]
    pub net: Option<Ipv4Addr>,

    /// Directory that becomes the container's root filesystem.
    pub image: PathBuf,

    /// Command to run as the container's init process.
    pub command: String,

    /// Arguments passed to the command.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Executes the `run` command.
///
/// Prints the container's host-visible pid to stdout. For a foreground
/// container it blocks until the container exits and then exits this
/// process with the containerized command's exit code.
///
/// # Errors
///
/// Returns an error if container creation fails.
pub fn execute(dirs: &RuntimeDirs, args: RunArgs) -> anyhow::Result<()> {
    let opts = ContainerOptions {
        daemonize: args.daemonize,
        cpu_percent: args.cpu,
        ip: args.net,
        root_path: args.image,
        command: args.command,
        args: args.args,
    };
    let outcome = cage_runtime::start::start(dirs, &opts)?;
    tracing::debug!(pid = outcome.pid, "run command finished");
    if let Some(code) = outcome.exit_code {
        std::process::exit(code);
    }
    Ok(())
}
