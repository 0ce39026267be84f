//! `cage exec` — Execute a command inside a running container.

use clap::Args;

use cage_common::config::RuntimeDirs;

/// Arguments for the `exec` command.
#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Pid of the container to enter.
    pub pid: i32,

    /// Command to run inside the container.
    pub command: String,

    /// Arguments passed to the command.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Executes the `exec` command.
///
/// Exits this process with the inner command's exit code.
///
/// # Errors
///
/// Returns an error if the container is unknown or joining it fails.
pub fn execute(dirs: &RuntimeDirs, args: ExecArgs) -> anyhow::Result<()> {
    let code = cage_runtime::exec::exec_in_container(dirs, args.pid, &args.command, &args.args)?;
    std::process::exit(code);
}
