//! Check-config command - load settings without touching the network

use anyhow::Result;
use colored::Colorize;

use super::load_config;
use crate::output;

pub fn run() -> Result<()> {
    let config = load_config()?;

    println!("{}", "Configuration".bold());
    println!();

    println!("{}", output::key_value_table(config.describe()));
    println!();

    if config.store.credentials.is_none() {
        output::warning("No AWS credentials set: only --local-dir and --dry-run runs will work");
    } else {
        output::success("Configuration OK");
    }
    Ok(())
}
