//! Runtime directory layout.
//!
//! Every registry, cgroup, and helper-script operation takes an explicit
//! [`RuntimeDirs`] value instead of consulting process-wide mutable state, so
//! two tool invocations with different roots cannot step on each other.

use std::path::{Path, PathBuf};

/// Locations of the durable state this runtime owns.
#[derive(Debug, Clone)]
pub struct RuntimeDirs {
    root: PathBuf,
    helper_dir: PathBuf,
}

impl RuntimeDirs {
    /// Creates a layout rooted at `root`, with helper scripts resolved from
    /// the directory containing the current executable.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            helper_dir: default_helper_dir(),
        }
    }

    /// Overrides the directory the helper scripts are resolved from.
    #[must_use]
    pub fn with_helper_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.helper_dir = dir.into();
        self
    }

    /// Base directory for all durable state.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the container registry file.
    #[must_use]
    pub fn registry_file(&self) -> PathBuf {
        self.root.join("containers")
    }

    /// Path of the advisory lock file guarding registry rewrites.
    #[must_use]
    pub fn registry_lock(&self) -> PathBuf {
        self.root.join("containers.lock")
    }

    /// Root of the cgroup hierarchy used for CPU-restricted containers,
    /// colocated with the registry.
    #[must_use]
    pub fn cgroup_root(&self) -> PathBuf {
        self.root.join("cgroup")
    }

    /// Full path of a named helper script.
    #[must_use]
    pub fn helper(&self, name: &str) -> PathBuf {
        self.helper_dir.join(name)
    }
}

impl Default for RuntimeDirs {
    fn default() -> Self {
        Self::new(crate::constants::data_dir().clone())
    }
}

/// Helper scripts ship next to the binary, like the registry tools they serve.
fn default_helper_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_derive_from_root() {
        let dirs = RuntimeDirs::new("/var/lib/cage-test");
        assert_eq!(
            dirs.registry_file(),
            PathBuf::from("/var/lib/cage-test/containers")
        );
        assert_eq!(
            dirs.registry_lock(),
            PathBuf::from("/var/lib/cage-test/containers.lock")
        );
        assert_eq!(
            dirs.cgroup_root(),
            PathBuf::from("/var/lib/cage-test/cgroup")
        );
    }

    #[test]
    fn helper_dir_override() {
        let dirs = RuntimeDirs::new("/tmp/x").with_helper_dir("/opt/cage/helpers");
        assert_eq!(
            dirs.helper("setup_net_host.sh"),
            PathBuf::from("/opt/cage/helpers/setup_net_host.sh")
        );
    }

    #[test]
    fn distinct_roots_stay_distinct() {
        let a = RuntimeDirs::new("/tmp/a");
        let b = RuntimeDirs::new("/tmp/b");
        assert_ne!(a.registry_file(), b.registry_file());
    }
}
