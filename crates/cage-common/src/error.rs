//! Unified error types for the cage workspace.
//!
//! Every failure in the runtime is terminal for the process that raised it;
//! there is no in-process retry. The variants therefore carry enough context
//! (operation name, path, OS error) to produce a usable diagnostic on exit.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum CageError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A raw system call failed.
    #[error("{op} failed: {source}")]
    Syscall {
        /// Name of the failing operation.
        op: &'static str,
        /// OS error returned by the kernel.
        source: nix::Error,
    },

    /// A configuration or option value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid value.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A container with this process id is already registered.
    #[error("container with pid {pid} is already registered")]
    Conflict {
        /// Process id of the conflicting registry record.
        pid: i32,
    },

    /// The peer closed its end of a synchronization channel mid-protocol.
    #[error("synchronization channel closed by peer")]
    ChannelClosed,

    /// An external helper program exited unsuccessfully.
    #[error("helper {name} exited with status {status}")]
    Collaborator {
        /// Name of the helper program.
        name: String,
        /// Exit status it reported (-1 if killed by a signal).
        status: i32,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CageError>;
