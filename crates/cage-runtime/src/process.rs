//! Process control: daemonization, child reaping, and exec.

use std::convert::Infallible;
use std::ffi::CString;
use std::fs::OpenOptions;
use std::os::fd::AsRawFd;

use nix::errno::Errno;
use nix::sys::stat::{Mode, umask};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, chdir, fork, setsid};

use cage_common::error::{CageError, Result};

/// Detaches the calling process from its terminal and session.
///
/// Classic double-fork: the original process and the first child both exit,
/// so the survivor is a non-session-leader in a fresh session with its
/// standard streams on `/dev/null`. The caller continues as a different
/// pid than it entered with.
///
/// # Errors
///
/// Returns an error if a fork, `setsid`, `chdir`, or the `/dev/null`
/// redirection fails.
pub fn daemonize() -> Result<()> {
    fork_and_exit_parent()?;
    setsid().map_err(|source| CageError::Syscall {
        op: "setsid",
        source,
    })?;
    fork_and_exit_parent()?;
    chdir("/").map_err(|source| CageError::Syscall { op: "chdir", source })?;

    let null = OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")
        .map_err(|source| CageError::Io {
            path: "/dev/null".into(),
            source,
        })?;
    for fd in 0..=2 {
        if unsafe { libc::dup2(null.as_raw_fd(), fd) } < 0 {
            return Err(CageError::Syscall {
                op: "dup2",
                source: Errno::last(),
            });
        }
    }
    let _ = umask(Mode::from_bits_truncate(0o027));
    Ok(())
}

fn fork_and_exit_parent() -> Result<()> {
    match unsafe { fork() }.map_err(|source| CageError::Syscall { op: "fork", source })? {
        ForkResult::Parent { .. } => unsafe { libc::_exit(0) },
        ForkResult::Child => Ok(()),
    }
}

/// Blocks until `child` terminates and maps its status to a shell-style
/// exit code (`128 + signal` for signal deaths).
///
/// # Errors
///
/// Returns an error if `waitpid(2)` fails.
pub fn wait_for_child(child: Pid) -> Result<i32> {
    loop {
        match waitpid(child, None).map_err(|source| CageError::Syscall {
            op: "waitpid",
            source,
        })? {
            WaitStatus::Exited(_, code) => return Ok(code),
            WaitStatus::Signaled(_, signal, _) => return Ok(128 + signal as i32),
            _ => {}
        }
    }
}

/// Replaces the current process image with `command`, resolved via `PATH`.
///
/// # Errors
///
/// Returns an error if the command contains a NUL byte or `execvp(2)`
/// fails; on success this function does not return.
pub fn exec_command(command: &str, args: &[String]) -> Result<Infallible> {
    let program = CString::new(command).map_err(|_| CageError::Config {
        message: format!("command contains a NUL byte: {command:?}"),
    })?;
    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push(program.clone());
    for arg in args {
        argv.push(CString::new(arg.as_str()).map_err(|_| CageError::Config {
            message: format!("argument contains a NUL byte: {arg:?}"),
        })?);
    }
    nix::unistd::execvp(&program, &argv).map_err(|source| CageError::Syscall {
        op: "execvp",
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nul_in_command_is_rejected_before_exec() {
        assert!(matches!(
            exec_command("tr\0ue", &[]),
            Err(CageError::Config { .. })
        ));
    }

    #[test]
    fn nul_in_argument_is_rejected_before_exec() {
        assert!(matches!(
            exec_command("true", &["a\0b".into()]),
            Err(CageError::Config { .. })
        ));
    }

    #[test]
    fn wait_reports_exit_code() {
        match unsafe { fork() }.unwrap() {
            ForkResult::Child => unsafe { libc::_exit(23) },
            ForkResult::Parent { child } => {
                assert_eq!(wait_for_child(child).unwrap(), 23);
            }
        }
    }

    #[test]
    fn wait_reports_signal_death_as_128_plus_signal() {
        use nix::sys::signal::{Signal, kill};

        match unsafe { fork() }.unwrap() {
            ForkResult::Child => loop {
                std::thread::sleep(std::time::Duration::from_secs(1));
            },
            ForkResult::Parent { child } => {
                kill(child, Signal::SIGKILL).unwrap();
                assert_eq!(wait_for_child(child).unwrap(), 128 + libc::SIGKILL);
            }
        }
    }
}
