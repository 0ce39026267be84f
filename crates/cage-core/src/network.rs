//! Private networking over a veth pair.
//!
//! Interface names are derived from the container's host-visible pid so
//! concurrent containers never collide. Address math and naming live here;
//! the actual `ip` commands run in helper scripts because the host side
//! needs to move one end of the pair into another network namespace.

use std::net::Ipv4Addr;

use cage_common::config::RuntimeDirs;
use cage_common::error::Result;

use crate::helper;

/// Helper script that creates the veth pair on the host.
pub const HOST_SCRIPT: &str = "setup_net_host.sh";

/// Helper script that configures the container's end of the pair.
pub const CONTAINER_SCRIPT: &str = "setup_net_cont.sh";

/// Name of the host end of the veth pair.
#[must_use]
pub fn host_veth_name(pid: i32) -> String {
    format!("host_{pid}_veth")
}

/// Name of the container end of the veth pair.
#[must_use]
pub fn container_veth_name(pid: i32) -> String {
    format!("cont_{pid}_veth")
}

/// Host address paired with a container address: the next address on the
/// same /24. Option validation guarantees the last octet is in 1..=253,
/// so the increment never crosses the broadcast address.
#[must_use]
pub fn host_ip(container_ip: Ipv4Addr) -> Ipv4Addr {
    let mut octets = container_ip.octets();
    octets[3] = octets[3].wrapping_add(1);
    Ipv4Addr::from(octets)
}

/// Creates the veth pair, pushes the container end into the container's
/// network namespace, and brings the host end up. Runs on the host.
///
/// # Errors
///
/// Returns an error if the helper script fails.
pub fn setup_host_side(dirs: &RuntimeDirs, pid: i32, container_ip: Ipv4Addr) -> Result<()> {
    tracing::info!(pid, ip = %container_ip, "configuring host side of veth pair");
    helper::run(
        dirs,
        HOST_SCRIPT,
        &[
            &pid.to_string(),
            &host_veth_name(pid),
            &container_veth_name(pid),
            &host_ip(container_ip).to_string(),
        ],
    )
}

/// Assigns the container address and default route. Runs inside the
/// container's network namespace, before the root is pivoted.
///
/// # Errors
///
/// Returns an error if the helper script fails.
pub fn setup_container_side(dirs: &RuntimeDirs, pid: i32, container_ip: Ipv4Addr) -> Result<()> {
    tracing::info!(pid, ip = %container_ip, "configuring container side of veth pair");
    helper::run(
        dirs,
        CONTAINER_SCRIPT,
        &[
            &container_veth_name(pid),
            &container_ip.to_string(),
            &host_ip(container_ip).to_string(),
        ],
    )
}
