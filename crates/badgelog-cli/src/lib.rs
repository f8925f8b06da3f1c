//! Badge log CLI library.
//!
//! This crate provides the CLI interface for badgelog.

mod cli;
pub mod commands;
mod config;
pub mod enrich;

pub use cli::{Cli, Commands};
pub use config::Config;
