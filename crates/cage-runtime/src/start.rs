//! Host-side orchestration of container creation.

use nix::sys::signal::{Signal, kill};
use nix::sys::wait::waitpid;
use nix::unistd::{ForkResult, Pid, fork};

use cage_common::config::RuntimeDirs;
use cage_common::error::{CageError, Result};
use cage_common::types::{ContainerOptions, ContainerRecord};
use cage_core::sync::SyncEndpoint;
use cage_core::{cgroup, namespace, network, sync};

use crate::registry::Registry;
use crate::{init, process};

/// Result of a container creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartOutcome {
    /// Host-visible pid of the container's init process.
    pub pid: i32,
    /// Exit code of the containerized command for a foreground container
    /// (`128 + signal` for signal deaths); `None` when daemonized.
    pub exit_code: Option<i32>,
}

/// Creates a container and prints its host-visible pid to stdout.
///
/// For a foreground container this blocks until the container exits,
/// unregisters it on the way out, and reports its exit code; a daemonized
/// container is left running detached.
///
/// # Errors
///
/// Returns an error if the options are invalid or any step of the creation
/// protocol fails.
pub fn start(dirs: &RuntimeDirs, opts: &ContainerOptions) -> Result<StartOutcome> {
    opts.validate()?;
    let (host, container) = sync::pair()?;
    match unsafe { fork() }.map_err(|source| CageError::Syscall { op: "fork", source })? {
        ForkResult::Child => {
            drop(host);
            // init::run only comes back on error; on success it execs.
            if let Err(err) = init::run(dirs, opts, container) {
                tracing::error!(error = %err, "container setup failed");
            }
            unsafe { libc::_exit(1) }
        }
        ForkResult::Parent { child } => {
            drop(container);
            host_side(dirs, opts, &host, child)
        }
    }
}

fn host_side(
    dirs: &RuntimeDirs,
    opts: &ContainerOptions,
    host: &SyncEndpoint,
    intermediate: Pid,
) -> Result<StartOutcome> {
    let cont_pid = host.recv_pid()?;
    tracing::debug!(pid = cont_pid, "container init process created");

    namespace::write_id_maps(cont_pid)?;
    host.notify()?;

    if let Some(ip) = opts.ip {
        network::setup_host_side(dirs, cont_pid, ip)?;
        host.notify()?;
    }

    host.wait()?; // container finished namespace and filesystem setup
    cgroup::apply_cpu_limit(dirs, cont_pid, opts.cpu_percent)?;

    let registry = Registry::new(dirs);
    let record = ContainerRecord {
        pid: cont_pid,
        cpu_percent: opts.cpu_percent,
    };
    if let Err(err) = registry.register(record) {
        // Never leave an untracked container running: kill the init that
        // is still parked on the proceed signal and reap the intermediate.
        let _ = kill(Pid::from_raw(cont_pid), Signal::SIGKILL);
        let _ = waitpid(intermediate, None);
        return Err(err);
    }
    println!("{cont_pid}");

    host.notify()?; // clear to exec

    reap_outcome(&registry, opts.daemonize, intermediate, cont_pid)
}

/// Terminal half of the host side: detach from a daemonized container, or
/// reap a foreground one and surface its exit code.
fn reap_outcome(
    registry: &Registry,
    daemonize: bool,
    intermediate: Pid,
    cont_pid: i32,
) -> Result<StartOutcome> {
    if daemonize {
        // The intermediate already exited during daemonization; just reap.
        let _ = waitpid(intermediate, None);
        tracing::info!(pid = cont_pid, "container detached");
        return Ok(StartOutcome {
            pid: cont_pid,
            exit_code: None,
        });
    }

    // The intermediate exits with the container init's code, so waiting on
    // it forwards the containerized command's exit status.
    let code = process::wait_for_child(intermediate)?;
    tracing::info!(pid = cont_pid, code, "container exited");
    registry.unregister(cont_pid)?;
    Ok(StartOutcome {
        pid: cont_pid,
        exit_code: Some(code),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn invalid_options_fail_before_any_side_effect() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = RuntimeDirs::new(dir.path()).with_helper_dir(dir.path());
        let opts = ContainerOptions {
            daemonize: false,
            cpu_percent: 0,
            ip: None,
            root_path: PathBuf::from("/tmp/rootfs"),
            command: "/bin/true".into(),
            args: Vec::new(),
        };
        assert!(matches!(
            start(&dirs, &opts),
            Err(CageError::Config { .. })
        ));
        assert!(!dirs.registry_file().exists());
    }

    fn fork_exiting_with(code: i32) -> Pid {
        match unsafe { fork() }.unwrap() {
            ForkResult::Child => unsafe { libc::_exit(code) },
            ForkResult::Parent { child } => child,
        }
    }

    #[test]
    fn foreground_outcome_carries_the_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = RuntimeDirs::new(dir.path());
        let registry = Registry::new(&dirs);
        let own_pid = i32::try_from(std::process::id()).unwrap();
        registry
            .register(ContainerRecord {
                pid: own_pid,
                cpu_percent: 100,
            })
            .unwrap();

        let intermediate = fork_exiting_with(7);
        let outcome = reap_outcome(&registry, false, intermediate, own_pid).unwrap();
        assert_eq!(
            outcome,
            StartOutcome {
                pid: own_pid,
                exit_code: Some(7),
            }
        );
        // Foreground exit also unregisters the container.
        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn daemonized_outcome_has_no_exit_code_and_keeps_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = RuntimeDirs::new(dir.path());
        let registry = Registry::new(&dirs);
        let own_pid = i32::try_from(std::process::id()).unwrap();
        registry
            .register(ContainerRecord {
                pid: own_pid,
                cpu_percent: 100,
            })
            .unwrap();

        let intermediate = fork_exiting_with(0);
        let outcome = reap_outcome(&registry, true, intermediate, own_pid).unwrap();
        assert_eq!(
            outcome,
            StartOutcome {
                pid: own_pid,
                exit_code: None,
            }
        );
        assert_eq!(registry.list().unwrap().len(), 1);
    }
}
