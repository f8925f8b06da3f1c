//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::audit::AuditArgs;
use crate::commands::import::ImportArgs;
use crate::commands::occupancy::OccupancyArgs;
use crate::commands::sessions::SessionsArgs;
use crate::commands::week::WeekArgs;

/// Badge swipe log reconciliation.
///
/// Reconstructs visit sessions, anomalies, and current occupancy from
/// imperfect entry/exit badge logs.
#[derive(Debug, Parser)]
#[command(name = "badgelog", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import swipe rows from JSON lines on stdin.
    Import(ImportArgs),

    /// Show database status.
    Status,

    /// Show who is currently present and for how long.
    Occupancy(OccupancyArgs),

    /// List completed visits with durations.
    Sessions(SessionsArgs),

    /// Audit the log for anomalous swipe sequences.
    Audit(AuditArgs),

    /// Translate dates to term weeks and back.
    Week(WeekArgs),
}
