//! Command-line interface
//!
//! Argument parsing for the demo driver.

pub mod commands;

pub use commands::{Command, Opt};
