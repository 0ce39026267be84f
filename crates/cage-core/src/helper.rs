//! Invocation of the external helper scripts.
//!
//! Network interface and cgroup plumbing is delegated to shell scripts that
//! ship next to the binary. The contract is exit-status only: a zero exit
//! means success, anything else is reported as a collaborator failure.

use std::process::Command;

use cage_common::config::RuntimeDirs;
use cage_common::error::{CageError, Result};

/// Runs the named helper script with the given arguments.
///
/// # Errors
///
/// Returns [`CageError::Io`] if the script could not be spawned, or
/// [`CageError::Collaborator`] if it exited unsuccessfully.
pub fn run(dirs: &RuntimeDirs, name: &str, args: &[&str]) -> Result<()> {
    let script = dirs.helper(name);
    tracing::debug!(script = %script.display(), ?args, "running helper script");
    let status = Command::new("sh")
        .arg(&script)
        .args(args)
        .status()
        .map_err(|source| CageError::Io {
            path: script,
            source,
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(CageError::Collaborator {
            name: name.to_owned(),
            status: status.code().unwrap_or(-1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn dirs_with_script(dir: &tempfile::TempDir, name: &str, body: &str) -> RuntimeDirs {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        RuntimeDirs::new(dir.path()).with_helper_dir(dir.path())
    }

    #[test]
    fn successful_script_reports_ok() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = dirs_with_script(&dir, "ok.sh", "#!/bin/sh\nexit 0\n");
        assert!(run(&dirs, "ok.sh", &[]).is_ok());
    }

    #[test]
    fn failing_script_reports_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = dirs_with_script(&dir, "fail.sh", "#!/bin/sh\nexit 7\n");
        match run(&dirs, "fail.sh", &[]) {
            Err(CageError::Collaborator { name, status }) => {
                assert_eq!(name, "fail.sh");
                assert_eq!(status, 7);
            }
            other => panic!("expected collaborator error, got {other:?}"),
        }
    }

    #[test]
    fn arguments_reach_the_script() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let body = format!("#!/bin/sh\necho \"$1 $2\" > {}\n", marker.display());
        let dirs = dirs_with_script(&dir, "args.sh", &body);
        run(&dirs, "args.sh", &["alpha", "beta"]).unwrap();
        assert_eq!(std::fs::read_to_string(marker).unwrap().trim(), "alpha beta");
    }

    #[test]
    fn missing_script_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = RuntimeDirs::new(dir.path()).with_helper_dir(dir.path());
        assert!(run(&dirs, "absent.sh", &[]).is_err());
    }
}
