//! CLI subcommand implementations.

pub mod audit;
pub mod import;
pub mod occupancy;
pub mod sessions;
pub mod status;
pub mod util;
pub mod week;
