//! Configuration commands.

use crate::output::{self, OutputFormat};
use anyhow::Result;
use client_core::{Config, Paths};

/// Show the effective configuration.
pub fn config_show(config: &Config, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let paths = Paths::new()?;
            output::print_heading("Configuration");
            output::print_row("API URL", &config.api_url);
            output::print_row("Log level", &config.log_level);
            output::print_row("Config file", &paths.config_file().display().to_string());
            output::print_row("Store file", &paths.store_file().display().to_string());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
    }
    Ok(())
}
