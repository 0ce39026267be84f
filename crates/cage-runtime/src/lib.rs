//! # cage-runtime
//!
//! Container lifecycle orchestration: the host/container creation protocol,
//! the durable pid registry, joining a running container with a new
//! process, and stopping containers.

// fork(2) has no safe wrapper. The runtime is single-threaded, so the
// forked children may keep running arbitrary code before exec or _exit.
#![allow(unsafe_code)]

pub mod exec;
pub mod init;
pub mod process;
pub mod registry;
pub mod start;
pub mod stop;
