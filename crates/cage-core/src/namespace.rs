//! Namespace creation and joining.
//!
//! A container gets six new namespaces. User, mount, UTS, IPC, and network
//! namespaces are unshared in one call; the PID namespace is unshared
//! separately because it only takes effect for children, so the caller must
//! fork once more afterwards to produce the container's init process.

use std::path::PathBuf;

use cage_common::error::{CageError, Result};

/// Unshares the user, mount, UTS, IPC, and network namespaces of the
/// calling process.
///
/// # Errors
///
/// Returns an error if `unshare(2)` fails.
#[cfg(target_os = "linux")]
pub fn unshare_container() -> Result<()> {
    use nix::sched::{CloneFlags, unshare};

    let flags = CloneFlags::CLONE_NEWUSER
        | CloneFlags::CLONE_NEWNS
        | CloneFlags::CLONE_NEWUTS
        | CloneFlags::CLONE_NEWIPC
        | CloneFlags::CLONE_NEWNET;
    unshare(flags).map_err(|source| CageError::Syscall {
        op: "unshare",
        source,
    })?;
    tracing::debug!("unshared user, mount, uts, ipc, and net namespaces");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — namespace isolation requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn unshare_container() -> Result<()> {
    Err(CageError::Config {
        message: "Linux required for container operations".into(),
    })
}

/// Unshares the PID namespace.
///
/// The calling process keeps its own PID namespace; the next forked child
/// becomes PID 1 of the new one.
///
/// # Errors
///
/// Returns an error if `unshare(2)` fails.
#[cfg(target_os = "linux")]
pub fn unshare_pid() -> Result<()> {
    use nix::sched::{CloneFlags, unshare};

    unshare(CloneFlags::CLONE_NEWPID).map_err(|source| CageError::Syscall {
        op: "unshare",
        source,
    })?;
    tracing::debug!("unshared pid namespace");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — namespace isolation requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn unshare_pid() -> Result<()> {
    Err(CageError::Config {
        message: "Linux required for container operations".into(),
    })
}

/// Sets the hostname inside the container's UTS namespace.
///
/// # Errors
///
/// Returns an error if `sethostname(2)` fails.
#[cfg(target_os = "linux")]
pub fn set_container_hostname() -> Result<()> {
    nix::unistd::sethostname(cage_common::constants::CONTAINER_HOSTNAME).map_err(|source| {
        CageError::Syscall {
            op: "sethostname",
            source,
        }
    })
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — namespace isolation requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn set_container_hostname() -> Result<()> {
    Err(CageError::Config {
        message: "Linux required for container operations".into(),
    })
}

/// Maps the container's root user onto the invoking user, from the host
/// side of the user namespace.
///
/// `setgroups` must be denied before an unprivileged process may write
/// `gid_map` (Linux 3.19 and later).
///
/// # Errors
///
/// Returns an error if any of the `/proc/<pid>` map files cannot be
/// written.
pub fn write_id_maps(pid: i32) -> Result<()> {
    let base = PathBuf::from("/proc").join(pid.to_string());
    let uid = nix::unistd::geteuid().as_raw();
    let gid = nix::unistd::getegid().as_raw();

    for (name, contents) in [
        ("setgroups", "deny".to_owned()),
        ("uid_map", format!("0 {uid} 1")),
        ("gid_map", format!("0 {gid} 1")),
    ] {
        let path = base.join(name);
        std::fs::write(&path, contents).map_err(|source| CageError::Io { path, source })?;
    }
    tracing::debug!(pid, uid, gid, "wrote user namespace id maps");
    Ok(())
}

/// Moves the calling process's children into all six namespaces of a
/// running container.
///
/// The user namespace is joined first so the caller gains the capabilities
/// needed for the rest; the mount namespace is joined last because the
/// `/proc/<pid>/ns` paths stop resolving once the mount namespace changes.
/// All namespace files are opened up front for the same reason.
///
/// # Errors
///
/// Returns an error if a namespace file cannot be opened or `setns(2)`
/// fails.
#[cfg(target_os = "linux")]
pub fn join(pid: i32) -> Result<()> {
    use nix::sched::{CloneFlags, setns};

    const JOIN_ORDER: [(&str, CloneFlags); 6] = [
        ("user", CloneFlags::CLONE_NEWUSER),
        ("net", CloneFlags::CLONE_NEWNET),
        ("ipc", CloneFlags::CLONE_NEWIPC),
        ("uts", CloneFlags::CLONE_NEWUTS),
        ("pid", CloneFlags::CLONE_NEWPID),
        ("mnt", CloneFlags::CLONE_NEWNS),
    ];

    let ns_dir = PathBuf::from("/proc").join(pid.to_string()).join("ns");
    let mut handles = Vec::with_capacity(JOIN_ORDER.len());
    for (name, flags) in JOIN_ORDER {
        let path = ns_dir.join(name);
        let file =
            std::fs::File::open(&path).map_err(|source| CageError::Io { path, source })?;
        handles.push((name, file, flags));
    }
    for (name, file, flags) in handles {
        setns(&file, flags).map_err(|source| CageError::Syscall {
            op: "setns",
            source,
        })?;
        tracing::debug!(pid, namespace = name, "joined namespace");
    }
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — namespace isolation requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn join(_pid: i32) -> Result<()> {
    Err(CageError::Config {
        message: "Linux required for container operations".into(),
    })
}
