//! Rendezvous channel between the host process and the container process.
//!
//! The creation protocol is a fixed sequence of blocking handshakes over two
//! pipes. Each side owns one [`SyncEndpoint`] and must drop the other after
//! forking, so that a crashed peer is observed as end-of-file instead of a
//! hang.

use std::os::fd::OwnedFd;

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::unistd::{pipe2, read, write};

use cage_common::error::{CageError, Result};

/// One side of a bidirectional host/container rendezvous.
#[derive(Debug)]
pub struct SyncEndpoint {
    rx: OwnedFd,
    tx: OwnedFd,
}

/// Creates a connected pair of endpoints.
///
/// All four descriptors are `O_CLOEXEC`: once the container execs its
/// command, its copies close and the channel cannot outlive the protocol.
///
/// # Errors
///
/// Returns an error if pipe creation fails.
pub fn pair() -> Result<(SyncEndpoint, SyncEndpoint)> {
    let (a_rx, a_tx) = pipe2(OFlag::O_CLOEXEC).map_err(|source| CageError::Syscall {
        op: "pipe2",
        source,
    })?;
    let (b_rx, b_tx) = pipe2(OFlag::O_CLOEXEC).map_err(|source| CageError::Syscall {
        op: "pipe2",
        source,
    })?;
    Ok((
        SyncEndpoint { rx: b_rx, tx: a_tx },
        SyncEndpoint { rx: a_rx, tx: b_tx },
    ))
}

impl SyncEndpoint {
    fn write_all(&self, mut buf: &[u8]) -> Result<()> {
        while !buf.is_empty() {
            match write(&self.tx, buf) {
                Ok(n) => buf = &buf[n..],
                Err(Errno::EINTR) => {}
                Err(source) => return Err(CageError::Syscall { op: "write", source }),
            }
        }
        Ok(())
    }

    fn read_exact(&self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match read(&self.rx, &mut buf[filled..]) {
                Ok(0) => return Err(CageError::ChannelClosed),
                Ok(n) => filled += n,
                Err(Errno::EINTR) => {}
                Err(source) => return Err(CageError::Syscall { op: "read", source }),
            }
        }
        Ok(())
    }

    /// Sends a process id to the peer.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn send_pid(&self, pid: i32) -> Result<()> {
        self.write_all(&pid.to_ne_bytes())
    }

    /// Receives a process id from the peer.
    ///
    /// # Errors
    ///
    /// Returns [`CageError::ChannelClosed`] if the peer closed its end, or
    /// an error if the read fails.
    pub fn recv_pid(&self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(i32::from_ne_bytes(buf))
    }

    /// Signals the peer that it may advance to its next protocol step.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn notify(&self) -> Result<()> {
        self.write_all(&[1])
    }

    /// Blocks until the peer signals, or fails with
    /// [`CageError::ChannelClosed`] if the peer exited mid-protocol.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the peer is gone.
    pub fn wait(&self) -> Result<()> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_round_trips_between_endpoints() {
        let (host, container) = pair().unwrap();
        container.send_pid(4242).unwrap();
        assert_eq!(host.recv_pid().unwrap(), 4242);
        host.send_pid(-1).unwrap();
        assert_eq!(container.recv_pid().unwrap(), -1);
    }

    #[test]
    fn notify_unblocks_wait() {
        let (host, container) = pair().unwrap();
        host.notify().unwrap();
        container.wait().unwrap();
    }

    #[test]
    fn dropped_peer_reports_closed_channel() {
        let (host, container) = pair().unwrap();
        drop(host);
        assert!(matches!(container.wait(), Err(CageError::ChannelClosed)));
    }

    #[test]
    fn signals_queue_in_order() {
        let (host, container) = pair().unwrap();
        host.notify().unwrap();
        host.notify().unwrap();
        container.wait().unwrap();
        container.wait().unwrap();
    }
}
