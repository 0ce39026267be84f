//! Stopping a running container.

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

use cage_common::config::RuntimeDirs;
use cage_common::error::{CageError, Result};

use crate::registry::Registry;

/// Sends `signal` to the container's init process and removes it from the
/// registry.
///
/// Killing PID 1 of a PID namespace takes the whole container with it. A
/// container that is already gone by the time the signal lands is treated
/// as stopped, not as an error.
///
/// # Errors
///
/// Returns [`CageError::NotFound`] if no live container has this pid, or
/// an error if the signal cannot be delivered or the registry cannot be
/// updated.
pub fn stop_container(dirs: &RuntimeDirs, pid: i32, signal: Signal) -> Result<()> {
    let registry = Registry::new(dirs);
    if registry.lookup(pid)?.is_none() {
        return Err(CageError::NotFound {
            kind: "container",
            id: pid.to_string(),
        });
    }
    match kill(Pid::from_raw(pid), signal) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(source) => return Err(CageError::Syscall { op: "kill", source }),
    }
    registry.unregister(pid)?;
    tracing::info!(pid, %signal, "container stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cage_common::types::ContainerRecord;

    #[test]
    fn unknown_container_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = RuntimeDirs::new(dir.path());
        assert!(matches!(
            stop_container(&dirs, 0x7fff_fff0, Signal::SIGKILL),
            Err(CageError::NotFound { .. })
        ));
    }

    #[test]
    fn stop_kills_and_unregisters() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = RuntimeDirs::new(dir.path());
        let registry = Registry::new(&dirs);

        let mut child = std::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .unwrap();
        let pid = i32::try_from(child.id()).unwrap();
        registry
            .register(ContainerRecord {
                pid,
                cpu_percent: 100,
            })
            .unwrap();

        stop_container(&dirs, pid, Signal::SIGKILL).unwrap();
        assert!(registry.list().unwrap().is_empty());
        let status = child.wait().unwrap();
        assert!(!status.success());
    }
}
