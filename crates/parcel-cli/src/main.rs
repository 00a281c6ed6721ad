//! ParcelTrack CLI - account and session management for the parcel
//! delivery service.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use client_core::{Config, Paths};

/// ParcelTrack CLI for authentication and session management.
#[derive(Parser)]
#[command(name = "parcel")]
#[command(about = "ParcelTrack CLI for authentication and session management")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Login with email and password
    Login,

    /// Logout and clear the session
    Logout,

    /// Check authentication status
    Status,

    /// Register a new account
    Register,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = Paths::new()
        .and_then(|paths| Config::load(&paths))
        .unwrap_or_else(|_| Config::new());

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.log_level.clone());
    client_core::init_logging(&level);

    let result = match cli.command {
        Commands::Login => commands::login(&config, &cli.format).await,
        Commands::Logout => commands::logout(&config, &cli.format).await,
        Commands::Status => commands::status(&config, &cli.format).await,
        Commands::Register => commands::register(&config, &cli.format).await,
        Commands::Config { command } => match command {
            ConfigCommands::Show => commands::config_show(&config, &cli.format),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
