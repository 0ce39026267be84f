//! `cage ps` — List running containers.

use clap::Args;

use cage_common::config::RuntimeDirs;
use cage_runtime::registry::Registry;

/// Arguments for the `ps` command.
#[derive(Args, Debug)]
pub struct PsArgs {
    /// Also show the CPU share of each container.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Executes the `ps` command.
///
/// Prints one pid per line; stale records for containers that have died
/// are dropped along the way.
///
/// # Errors
///
/// Returns an error if the registry cannot be read.
pub fn execute(dirs: &RuntimeDirs, args: PsArgs) -> anyhow::Result<()> {
    let records = Registry::new(dirs).list()?;
    for record in records {
        if args.verbose {
            println!("{} cpu={}%", record.pid, record.cpu_percent);
        } else {
            println!("{}", record.pid);
        }
    }
    Ok(())
}
