//! kubetriage CLI library
//!
//! The `kubetriage` binary is a thin wrapper around this crate so the
//! command handlers can be exercised from integration tests.
//!
//! # Module Structure
//! - [`cli`]: clap argument definitions
//! - [`commands`]: one handler per subcommand
//! - [`output`]: text / JSON rendering
//! - [`error`]: CLI error type and exit codes
//! - [`logging`]: tracing subscriber setup

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
