//! Domain primitive types used across the cage workspace.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use crate::error::{CageError, Result};

/// Immutable description of one container-creation request.
///
/// Built once by the caller and handed to the orchestrator; it is never
/// mutated during creation.
#[derive(Debug, Clone)]
pub struct ContainerOptions {
    /// Detach the container from the launching terminal and session.
    pub daemonize: bool,
    /// CPU share in percent, 1..=100. 100 means unrestricted.
    pub cpu_percent: u8,
    /// Container-side IPv4 address. The host side of the veth pair gets the
    /// next address on the same /24. `None` disables private networking.
    pub ip: Option<Ipv4Addr>,
    /// Host path of the directory that becomes the container's root.
    pub root_path: PathBuf,
    /// Command executed as the container's init process.
    pub command: String,
    /// Arguments passed to the command.
    pub args: Vec<String>,
}

impl ContainerOptions {
    /// Checks the creation invariants.
    ///
    /// Called by the orchestrator before any OS-level side effect, so a bad
    /// request never leaves namespaces, mounts, or registry entries behind.
    ///
    /// # Errors
    ///
    /// Returns an error if the root path is empty or relative, the command
    /// is empty, `cpu_percent` is outside `1..=100`, or the container
    /// address leaves no room for the host peer on its /24.
    pub fn validate(&self) -> Result<()> {
        if self.root_path.as_os_str().is_empty() {
            return Err(CageError::Config {
                message: "container root path must not be empty".into(),
            });
        }
        // Daemonization chdirs to "/" before the root is pivoted, which
        // would silently re-base a relative path.
        if !self.root_path.is_absolute() {
            return Err(CageError::Config {
                message: format!(
                    "container root path must be absolute, got {}",
                    self.root_path.display()
                ),
            });
        }
        if self.command.is_empty() {
            return Err(CageError::Config {
                message: "no command specified to run inside the container".into(),
            });
        }
        if self.cpu_percent == 0 || self.cpu_percent > 100 {
            return Err(CageError::Config {
                message: format!("cpu percent must be in 1..=100, got {}", self.cpu_percent),
            });
        }
        if let Some(ip) = self.ip {
            // The host peer gets the next address on the same /24, so the
            // container may not take the network, broadcast, or the
            // address just below broadcast.
            let last = ip.octets()[3];
            if last == 0 || last >= 254 {
                return Err(CageError::Config {
                    message: format!(
                        "container ip {ip} must have a last octet in 1..=253 \
                         to leave room for the host peer on its /24"
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Persisted record of a running container.
///
/// Identity is the process id of the container's init process as seen from
/// the host PID namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerRecord {
    /// Host-visible process id of the container init process.
    pub pid: i32,
    /// CPU share the container was started with (100 = unrestricted).
    pub cpu_percent: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_options() -> ContainerOptions {
        ContainerOptions {
            daemonize: false,
            cpu_percent: 100,
            ip: None,
            root_path: PathBuf::from("/tmp/rootfs"),
            command: "/bin/true".into(),
            args: Vec::new(),
        }
    }

    #[test]
    fn valid_options_pass() {
        assert!(base_options().validate().is_ok());
    }

    #[test]
    fn empty_command_rejected() {
        let mut opts = base_options();
        opts.command = String::new();
        assert!(opts.validate().is_err());
    }

    #[test]
    fn empty_root_path_rejected() {
        let mut opts = base_options();
        opts.root_path = PathBuf::new();
        assert!(opts.validate().is_err());
    }

    #[test]
    fn zero_cpu_percent_rejected() {
        let mut opts = base_options();
        opts.cpu_percent = 0;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn excessive_cpu_percent_rejected() {
        let mut opts = base_options();
        opts.cpu_percent = 101;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn boundary_cpu_percents_accepted() {
        for percent in [1, 100] {
            let mut opts = base_options();
            opts.cpu_percent = percent;
            assert!(opts.validate().is_ok(), "percent {percent} should be valid");
        }
    }

    #[test]
    fn relative_root_path_rejected() {
        let mut opts = base_options();
        opts.root_path = PathBuf::from("rootfs/alpine");
        assert!(opts.validate().is_err());
    }

    #[test]
    fn unpeerable_container_addresses_rejected() {
        for last in [0, 254, 255] {
            let mut opts = base_options();
            opts.ip = Some(Ipv4Addr::new(10, 0, 0, last));
            assert!(
                opts.validate().is_err(),
                "last octet {last} leaves no host peer"
            );
        }
    }

    #[test]
    fn peerable_container_addresses_accepted() {
        for last in [1, 100, 253] {
            let mut opts = base_options();
            opts.ip = Some(Ipv4Addr::new(10, 0, 0, last));
            assert!(opts.validate().is_ok(), "last octet {last} should be valid");
        }
    }
}
