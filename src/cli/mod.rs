//! Command-line interface: argument parsing and command implementations.

pub mod commands;
pub mod parser;

pub use parser::{Cli, Commands};
