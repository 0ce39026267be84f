//! Durable registry of running containers.
//!
//! One binary file holds fixed-size records, one per container. Every
//! operation takes an exclusive `flock` on a sidecar lock file, reloads the
//! file, drops records whose process no longer exists, applies its change,
//! and rewrites the whole file. Readers and writers from concurrent tool
//! invocations therefore always observe a complete, reconciled registry.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use nix::sys::signal::kill;
use nix::unistd::Pid;

use cage_common::config::RuntimeDirs;
use cage_common::error::{CageError, Result};
use cage_common::types::ContainerRecord;

const RECORD_LEN: usize = 5;

/// Handle to the on-disk container registry.
#[derive(Debug)]
pub struct Registry {
    file: PathBuf,
    lock: PathBuf,
}

impl Registry {
    /// Creates a handle for the registry under the given runtime layout.
    #[must_use]
    pub fn new(dirs: &RuntimeDirs) -> Self {
        Self {
            file: dirs.registry_file(),
            lock: dirs.registry_lock(),
        }
    }

    /// Adds a record for a freshly created container.
    ///
    /// # Errors
    ///
    /// Returns [`CageError::Conflict`] if a live container with the same
    /// pid is already registered, or an error if the file cannot be
    /// updated.
    pub fn register(&self, record: ContainerRecord) -> Result<()> {
        let _guard = self.lock_exclusive()?;
        let mut records = reconcile(self.load()?);
        if records.iter().any(|r| r.pid == record.pid) {
            return Err(CageError::Conflict { pid: record.pid });
        }
        records.push(record);
        self.store(&records)?;
        tracing::info!(pid = record.pid, cpu = record.cpu_percent, "container registered");
        Ok(())
    }

    /// Removes the record for `pid`, returning it if it was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be updated.
    pub fn unregister(&self, pid: i32) -> Result<Option<ContainerRecord>> {
        let _guard = self.lock_exclusive()?;
        let mut records = reconcile(self.load()?);
        let removed = records
            .iter()
            .position(|r| r.pid == pid)
            .map(|idx| records.remove(idx));
        self.store(&records)?;
        if removed.is_some() {
            tracing::info!(pid, "container unregistered");
        }
        Ok(removed)
    }

    /// Looks up the record for `pid` among live containers.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or rewritten.
    pub fn lookup(&self, pid: i32) -> Result<Option<ContainerRecord>> {
        let _guard = self.lock_exclusive()?;
        let records = reconcile(self.load()?);
        self.store(&records)?;
        Ok(records.into_iter().find(|r| r.pid == pid))
    }

    /// Returns all live container records, persisting the reconciled view.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or rewritten.
    pub fn list(&self) -> Result<Vec<ContainerRecord>> {
        let _guard = self.lock_exclusive()?;
        let records = reconcile(self.load()?);
        self.store(&records)?;
        Ok(records)
    }

    fn lock_exclusive(&self) -> Result<Flock<File>> {
        if let Some(parent) = self.lock.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.lock)
            .map_err(|source| CageError::Io {
                path: self.lock.clone(),
                source,
            })?;
        Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, source)| CageError::Syscall {
            op: "flock",
            source,
        })
    }

    fn load(&self) -> Result<Vec<ContainerRecord>> {
        let bytes = match std::fs::read(&self.file) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CageError::Io {
                    path: self.file.clone(),
                    source,
                });
            }
        };
        let mut records = Vec::with_capacity(bytes.len() / RECORD_LEN);
        let chunks = bytes.chunks_exact(RECORD_LEN);
        if !chunks.remainder().is_empty() {
            tracing::warn!(
                path = %self.file.display(),
                "registry file has a truncated trailing record, ignoring it"
            );
        }
        for chunk in chunks {
            records.push(ContainerRecord {
                pid: i32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
                cpu_percent: chunk[4],
            });
        }
        Ok(records)
    }

    fn store(&self, records: &[ContainerRecord]) -> Result<()> {
        let mut bytes = Vec::with_capacity(records.len() * RECORD_LEN);
        for record in records {
            bytes.extend_from_slice(&record.pid.to_ne_bytes());
            bytes.push(record.cpu_percent);
        }
        std::fs::write(&self.file, bytes).map_err(|source| CageError::Io {
            path: self.file.clone(),
            source,
        })
    }
}

/// Drops records whose process no longer exists. A daemonized container
/// that died without its starter leaves a stale record behind; this is
/// where it gets cleaned up.
fn reconcile(records: Vec<ContainerRecord>) -> Vec<ContainerRecord> {
    records.into_iter().filter(|r| alive(r.pid)).collect()
}

fn alive(pid: i32) -> bool {
    // Signal 0 probes existence. EPERM still means the process exists.
    !matches!(kill(Pid::from_raw(pid), None), Err(Errno::ESRCH))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Far above the default kernel pid_max, so it can never be a live pid.
    const DEAD_PID: i32 = 0x7fff_fff0;

    fn own_pid() -> i32 {
        i32::try_from(std::process::id()).unwrap()
    }

    fn registry(dir: &tempfile::TempDir) -> Registry {
        Registry::new(&RuntimeDirs::new(dir.path()))
    }

    #[test]
    fn register_then_list_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        let record = ContainerRecord {
            pid: own_pid(),
            cpu_percent: 42,
        };
        reg.register(record).unwrap();
        assert_eq!(reg.list().unwrap(), vec![record]);
    }

    #[test]
    fn duplicate_pid_is_a_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        let record = ContainerRecord {
            pid: own_pid(),
            cpu_percent: 100,
        };
        reg.register(record).unwrap();
        assert!(matches!(
            reg.register(record),
            Err(CageError::Conflict { pid }) if pid == own_pid()
        ));
    }

    #[test]
    fn unregister_removes_and_returns_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        let record = ContainerRecord {
            pid: own_pid(),
            cpu_percent: 10,
        };
        reg.register(record).unwrap();
        assert_eq!(reg.unregister(own_pid()).unwrap(), Some(record));
        assert!(reg.list().unwrap().is_empty());
    }

    #[test]
    fn unregister_of_unknown_pid_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        assert_eq!(reg.unregister(12345).unwrap(), None);
    }

    #[test]
    fn dead_containers_are_reconciled_away() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        reg.register(ContainerRecord {
            pid: own_pid(),
            cpu_percent: 100,
        })
        .unwrap();
        // Write the dead record directly; register() would reconcile it on
        // its own load and the test would not prove anything.
        let live = reg.load().unwrap();
        let mut all = live.clone();
        all.push(ContainerRecord {
            pid: DEAD_PID,
            cpu_percent: 50,
        });
        reg.store(&all).unwrap();

        assert_eq!(reg.list().unwrap(), live);
    }

    #[test]
    fn lookup_finds_only_live_records() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        reg.store(&[ContainerRecord {
            pid: DEAD_PID,
            cpu_percent: 50,
        }])
        .unwrap();
        assert_eq!(reg.lookup(DEAD_PID).unwrap(), None);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        assert!(reg.list().unwrap().is_empty());
    }

    #[test]
    fn truncated_trailing_record_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        reg.register(ContainerRecord {
            pid: own_pid(),
            cpu_percent: 100,
        })
        .unwrap();
        let mut bytes = std::fs::read(dir.path().join("containers")).unwrap();
        bytes.extend_from_slice(&[1, 2, 3]);
        std::fs::write(dir.path().join("containers"), bytes).unwrap();
        assert_eq!(reg.list().unwrap().len(), 1);
    }
}
