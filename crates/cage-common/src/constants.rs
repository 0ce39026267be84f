//! System-wide constants and default paths.

use std::path::PathBuf;
use std::sync::OnceLock;

/// Default base directory for cage state on Linux with root access.
pub const SYSTEM_DATA_DIR: &str = "/var/lib/cage";

/// Hostname assigned inside every container's UTS namespace.
pub const CONTAINER_HOSTNAME: &str = "container";

/// Application name used in CLI output.
pub const APP_NAME: &str = "cage";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "cage";

/// Returns the data directory, preferring `$HOME/.cage` for non-root
/// environments, falling back to `/var/lib/cage`.
fn resolve_data_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        let user_dir = PathBuf::from(home).join(".cage");
        if std::fs::create_dir_all(&user_dir).is_ok() {
            return user_dir;
        }
    }
    PathBuf::from(SYSTEM_DATA_DIR)
}

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the resolved data directory for this session.
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(resolve_data_dir)
}
