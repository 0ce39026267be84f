//! CPU restriction via a cgroup shared by all containers with the same
//! percentage.
//!
//! The cgroup hierarchy lives under the runtime's state directory and is
//! mounted and populated by a helper script; this module derives the paths
//! and decides whether a restriction applies at all.

use std::path::PathBuf;

use cage_common::config::RuntimeDirs;
use cage_common::error::Result;

use crate::helper;

/// Helper script that mounts the hierarchy, creates the group, sets the
/// quota, and moves the pid in.
pub const CPU_SCRIPT: &str = "setup_cpu_cgroup.sh";

/// CPU percentage meaning "no restriction".
pub const UNRESTRICTED: u8 = 100;

/// Name of the cgroup holding every container limited to `percent`.
#[must_use]
pub fn cpu_group_name(percent: u8) -> String {
    format!("cpu_restricted_{percent}")
}

/// Path of the `cgroup.procs` file for the given percentage.
///
/// Only meaningful on the host side of the mount namespace boundary.
#[must_use]
pub fn cpu_procs_path(dirs: &RuntimeDirs, percent: u8) -> PathBuf {
    dirs.cgroup_root()
        .join(cpu_group_name(percent))
        .join("cgroup.procs")
}

/// Places `pid` under a CPU quota of `percent`. A percentage of 100 is a
/// no-op.
///
/// # Errors
///
/// Returns an error if the helper script fails.
pub fn apply_cpu_limit(dirs: &RuntimeDirs, pid: i32, percent: u8) -> Result<()> {
    if percent >= UNRESTRICTED {
        return Ok(());
    }
    tracing::info!(pid, percent, "applying cpu limit");
    let root = dirs.cgroup_root();
    helper::run(
        dirs,
        CPU_SCRIPT,
        &[
            &percent.to_string(),
            &pid.to_string(),
            &root.display().to_string(),
            &cpu_group_name(percent),
        ],
    )
}
