//! `cage stop` — Stop a running container.

use anyhow::Context;
use clap::Args;
use nix::sys::signal::Signal;

use cage_common::config::RuntimeDirs;

/// Arguments for the `stop` command.
#[derive(Args, Debug)]
pub struct StopArgs {
    /// Pid of the container to stop.
    pub pid: i32,

    /// Signal number to deliver to the container's init process.
    #[arg(default_value_t = libc::SIGKILL)]
    pub signal: i32,
}

/// Executes the `stop` command.
///
/// # Errors
///
/// Returns an error if the signal number is invalid, the container is not
/// registered, or delivery fails.
pub fn execute(dirs: &RuntimeDirs, args: StopArgs) -> anyhow::Result<()> {
    let signal = Signal::try_from(args.signal)
        .with_context(|| format!("invalid signal number {}", args.signal))?;
    cage_runtime::stop::stop_container(dirs, args.pid, signal)?;
    println!("OK");
    Ok(())
}
