//! # cage-core
//!
//! Linux isolation primitives used by the cage runtime: namespace creation
//! and joining, `pivot_root`-based filesystem isolation, veth pair naming,
//! CPU cgroup control, the host/container synchronization channel, and
//! invocation of the external helper scripts.
//!
//! Every function here acts on the calling process or on explicit
//! parameters; nothing in this crate reads process-wide mutable state.

pub mod cgroup;
pub mod helper;
pub mod namespace;
pub mod network;
pub mod rootfs;
pub mod sync;
