//! Filesystem isolation via `pivot_root`.
//!
//! Runs inside the container's mount namespace, after networking is
//! configured and immediately before exec: once the root is pivoted, host
//! paths (helper scripts, the original rootfs directory) are unreachable.
//!
//! Mount failures are terminal for the container process. Nothing is
//! unwound; the private mount namespace disappears with the process.

use std::path::Path;

use cage_common::error::{CageError, Result};

/// Name of the directory inside the new root that briefly holds the old
/// root during `pivot_root`.
const OLD_ROOT_DIR: &str = ".p_root";

/// Devices bind-mounted from the host into the container root. The second
/// field marks directory mounts.
const DEVICES: [(&str, bool); 4] = [
    ("dev/zero", false),
    ("dev/null", false),
    ("dev/mqueue", true),
    ("dev/shm", true),
];

/// Turns `root` into the container's `/`.
///
/// The sequence is order-sensitive: mounts are made private so nothing
/// propagates back to the host, fresh `proc` and `sysfs` instances are
/// mounted (the PID namespace is already in effect, so `/proc` shows only
/// container processes), host devices are bind-mounted, the new root is
/// bind-mounted onto itself to make it a mount point, and finally
/// `pivot_root` swaps it in and the old root is lazily detached.
///
/// # Errors
///
/// Returns an error if any mount, directory creation, or the pivot itself
/// fails.
#[cfg(target_os = "linux")]
pub fn enter_rootfs(root: &Path) -> Result<()> {
    use nix::mount::{MntFlags, MsFlags, mount, umount2};
    use nix::unistd::{chdir, pivot_root};

    mount(
        None::<&str>,
        "/",
        None::<&str>,
        MsFlags::MS_PRIVATE | MsFlags::MS_REC,
        None::<&str>,
    )
    .map_err(|source| CageError::Syscall {
        op: "mount(MS_PRIVATE)",
        source,
    })?;

    let special_flags = MsFlags::MS_NOSUID | MsFlags::MS_NOEXEC | MsFlags::MS_NODEV;
    mount(
        None::<&str>,
        &root.join("proc"),
        Some("proc"),
        special_flags,
        None::<&str>,
    )
    .map_err(|source| CageError::Syscall {
        op: "mount(proc)",
        source,
    })?;
    mount(
        None::<&str>,
        &root.join("sys"),
        Some("sysfs"),
        special_flags,
        None::<&str>,
    )
    .map_err(|source| CageError::Syscall {
        op: "mount(sysfs)",
        source,
    })?;

    for (dev, is_dir) in DEVICES {
        let target = root.join(dev);
        if is_dir {
            std::fs::create_dir_all(&target).map_err(|source| CageError::Io {
                path: target.clone(),
                source,
            })?;
        } else if !target.exists() {
            std::fs::File::create(&target).map_err(|source| CageError::Io {
                path: target.clone(),
                source,
            })?;
        }
        mount(
            Some(&Path::new("/").join(dev)),
            &target,
            None::<&str>,
            MsFlags::MS_BIND,
            None::<&str>,
        )
        .map_err(|source| CageError::Syscall {
            op: "mount(MS_BIND device)",
            source,
        })?;
    }

    let old_root = root.join(OLD_ROOT_DIR);
    if !old_root.exists() {
        std::fs::create_dir(&old_root).map_err(|source| CageError::Io {
            path: old_root.clone(),
            source,
        })?;
    }
    mount(
        Some(root),
        root,
        Some("bind"),
        MsFlags::MS_BIND | MsFlags::MS_REC,
        None::<&str>,
    )
    .map_err(|source| CageError::Syscall {
        op: "mount(MS_BIND root)",
        source,
    })?;
    pivot_root(root, &old_root).map_err(|source| CageError::Syscall {
        op: "pivot_root",
        source,
    })?;
    chdir("/").map_err(|source| CageError::Syscall { op: "chdir", source })?;
    umount2(
        &Path::new("/").join(OLD_ROOT_DIR),
        MntFlags::MNT_DETACH,
    )
    .map_err(|source| CageError::Syscall {
        op: "umount2(MNT_DETACH)",
        source,
    })?;
    if let Err(err) = std::fs::remove_dir(Path::new("/").join(OLD_ROOT_DIR)) {
        tracing::debug!(error = %err, "could not remove old root mount point");
    }
    tracing::debug!(root = %root.display(), "pivoted into container root");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — `pivot_root` requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn enter_rootfs(_root: &Path) -> Result<()> {
    Err(CageError::Config {
        message: "Linux required for container operations".into(),
    })
}
