//! Process runtime for switchyard.
//!
//! Owns the single local inference-server process that `local` targets are
//! forwarded to. See [`LocalServerSupervisor`].

#![deny(unsafe_code)]

mod command;
pub mod process;
mod supervisor;

pub use command::build_command;
pub use process::{shutdown_child, spawn_stream_reader};
pub use supervisor::LocalServerSupervisor;
