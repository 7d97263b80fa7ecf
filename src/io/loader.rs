use std::fs;
use std::path::Path;

use super::SimulationConfig;

use crate::error::ConfigError;

/// Reads a TOML configuration file and validates it.
pub fn load_config(path: impl AsRef<Path>) -> Result<SimulationConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> Result<SimulationConfig, ConfigError> {
    let config: SimulationConfig = toml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}
