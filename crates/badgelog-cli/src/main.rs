use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use badgelog_cli::commands::{audit, import, occupancy, sessions, status, week};
use badgelog_cli::{Cli, Commands, Config};

/// Load config and open the database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(badgelog_db::Database, Config)> {
    let config = load_config(config_path)?;

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db =
        badgelog_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    match &cli.command {
        Some(Commands::Import(args)) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            let inserted = import::run(&mut db, args)?;
            println!("Imported {inserted} swipe rows.");
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&mut io::stdout(), &db, &config.database_path)?;
        }
        Some(Commands::Occupancy(args)) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            occupancy::run(&mut io::stdout(), &db, &config, args)?;
        }
        Some(Commands::Sessions(args)) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            sessions::run(&mut io::stdout(), &db, &config, args)?;
        }
        Some(Commands::Audit(args)) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            audit::run(&mut io::stdout(), &db, &config, args)?;
        }
        Some(Commands::Week(args)) => {
            // No database needed to translate weeks.
            let config = load_config(cli.config.as_deref())?;
            week::run(&mut io::stdout(), &config, args)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
