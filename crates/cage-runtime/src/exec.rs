//! Running an additional process inside an existing container.

use std::fs::OpenOptions;
use std::io::Write;

use nix::unistd::{ForkResult, fork};

use cage_common::config::RuntimeDirs;
use cage_common::error::{CageError, Result};
use cage_core::{cgroup, namespace, sync};

use crate::process;
use crate::registry::Registry;

/// Joins the namespaces of the container identified by `pid` and runs
/// `command` inside it, blocking until it exits. Returns the command's
/// exit code (`128 + signal` for signal deaths).
///
/// The new process inherits the container's CPU restriction: it is moved
/// into the container's cgroup before it is allowed to exec.
///
/// # Errors
///
/// Returns [`CageError::NotFound`] if no live container has this pid, or
/// an error if joining, the cgroup move, or process control fails.
pub fn exec_in_container(
    dirs: &RuntimeDirs,
    pid: i32,
    command: &str,
    args: &[String],
) -> Result<i32> {
    let record = Registry::new(dirs)
        .lookup(pid)?
        .ok_or_else(|| CageError::NotFound {
            kind: "container",
            id: pid.to_string(),
        })?;

    // The cgroup hierarchy is a host path; open it before joining the
    // mount namespace makes it unreachable.
    let cgroup_procs = if record.cpu_percent < cgroup::UNRESTRICTED {
        let path = cgroup::cpu_procs_path(dirs, record.cpu_percent);
        Some(
            OpenOptions::new()
                .append(true)
                .open(&path)
                .map_err(|source| CageError::Io { path, source })?,
        )
    } else {
        None
    };

    namespace::join(pid)?;

    // setns(CLONE_NEWPID) only affects children, so fork: the child lands
    // fully inside the container, the parent stays to place it in the
    // cgroup and report its exit.
    let (parent_end, child_end) = sync::pair()?;
    match unsafe { fork() }.map_err(|source| CageError::Syscall { op: "fork", source })? {
        ForkResult::Parent { child } => {
            drop(child_end);
            if let Some(mut procs) = cgroup_procs {
                procs
                    .write_all(child.as_raw().to_string().as_bytes())
                    .map_err(|source| CageError::Io {
                        path: cgroup::cpu_procs_path(dirs, record.cpu_percent),
                        source,
                    })?;
            }
            parent_end.notify()?;
            process::wait_for_child(child)
        }
        ForkResult::Child => {
            drop(parent_end);
            let err = match child_end
                .wait()
                .and_then(|()| process::exec_command(command, args))
            {
                Ok(never) => match never {},
                Err(err) => err,
            };
            tracing::error!(error = %err, "exec inside container failed");
            unsafe { libc::_exit(1) }
        }
    }
}
