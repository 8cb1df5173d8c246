//! CLI command implementations

pub mod check_config;
pub mod institutions;
pub mod run;

use std::path::Path;

use anyhow::{Context, Result};
use finexport_core::config::AppConfig;
use finexport_core::InstitutionRegistry;

/// Load configuration from the environment (`.env` already applied)
pub fn load_config() -> Result<AppConfig> {
    AppConfig::from_env().context("Invalid configuration")
}

/// Registry from a JSON file, or the built-in one
pub fn load_registry(path: Option<&Path>) -> Result<InstitutionRegistry> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read institutions file: {:?}", path))?;
            InstitutionRegistry::from_json(&text)
                .with_context(|| format!("Invalid institutions file: {:?}", path))
        }
        None => Ok(InstitutionRegistry::builtin()),
    }
}
