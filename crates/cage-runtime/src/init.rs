//! Container-side half of the creation protocol.
//!
//! Runs in the process forked off by [`crate::start`], ending in either an
//! exec of the container command or process exit. It never returns to the
//! caller's stack, which the `Result<Infallible>` signature makes explicit.

use std::convert::Infallible;

use nix::unistd::{ForkResult, fork};

use cage_common::config::RuntimeDirs;
use cage_common::error::{CageError, Result};
use cage_common::types::ContainerOptions;
use cage_core::{namespace, network, rootfs, sync};
use cage_core::sync::SyncEndpoint;

use crate::process;

/// Sets up namespaces and the container init process, walks the rendezvous
/// protocol with the host, and execs the container command.
///
/// The PID namespace only applies to children, so after unsharing it this
/// forks once more: the intermediate parent stays behind to reap the
/// container init and forward its exit code, while the child (PID 1 inside
/// the container) finishes configuration and execs.
///
/// # Errors
///
/// Returns an error if any namespace, protocol, filesystem, or exec step
/// fails. On success it does not return.
pub fn run(
    dirs: &RuntimeDirs,
    opts: &ContainerOptions,
    channel: SyncEndpoint,
) -> Result<Infallible> {
    if opts.daemonize {
        process::daemonize()?;
    }
    namespace::unshare_container()?;
    namespace::unshare_pid()?;

    // The container init cannot learn its own host-visible pid after the
    // fork (getpid() reports 1 inside the new namespace), so the
    // intermediate sends it down a second channel.
    let (parent_end, child_end) = sync::pair()?;
    match unsafe { fork() }.map_err(|source| CageError::Syscall { op: "fork", source })? {
        ForkResult::Parent { child } => {
            // Close our copies of the host channel so the host sees EOF if
            // the container init dies mid-protocol.
            drop(channel);
            drop(child_end);
            parent_end.send_pid(child.as_raw())?;
            drop(parent_end);
            let code = process::wait_for_child(child)?;
            unsafe { libc::_exit(code) }
        }
        ForkResult::Child => {
            drop(parent_end);
            let pid = child_end.recv_pid()?;
            drop(child_end);

            channel.send_pid(pid)?;
            channel.wait()?; // id maps are in place, root works now
            namespace::set_container_hostname()?;
            if let Some(ip) = opts.ip {
                channel.wait()?; // host end of the veth pair is up
                network::setup_container_side(dirs, pid, ip)?;
            }
            // Must come last: helper scripts and the rootfs path itself
            // are host paths, unreachable once the root is pivoted.
            rootfs::enter_rootfs(&opts.root_path)?;
            channel.notify()?; // configuration finished
            channel.wait()?; // registered; clear to exec
            drop(channel);
            process::exec_command(&opts.command, &opts.args)
        }
    }
}
