//! Command-line front end for the switchyard proxy.
//!
//! `main.rs` only parses arguments and hands off to [`bootstrap`], which is
//! the single place where the registry, local-server supervisor and HTTP
//! router are wired together.

#![deny(unsafe_code)]

pub mod bootstrap;
pub mod logging;
pub mod parser;

pub use bootstrap::{ProxyContext, bootstrap, load_config};
pub use parser::Cli;
