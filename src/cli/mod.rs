//! Command-line interface
//!
//! Startup options are parsed with clap; once the node is up, a small REPL
//! on stdin drives it with dot-commands.

pub mod commands;

pub use commands::{Opt, ReplCommand};
