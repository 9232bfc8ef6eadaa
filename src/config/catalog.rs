//! Category seed configuration loading from config.toml
//!
//! The categories defined in config.toml are inserted into the catalog on startup
//! when a category with the same name does not exist yet.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize)]
pub struct CatalogConfig {
    /// List of categories to seed
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
}

/// Configuration for a single scrap category
#[derive(Debug, Deserialize, Clone)]
pub struct CategoryConfig {
    /// Display name of the category
    pub name: String,
    /// Unit of measure
    #[serde(default = "default_unit")]
    pub unit: String,
    /// Optional icon name
    pub icon: Option<String>,
    /// Optional description
    pub description: Option<String>,
}

fn default_unit() -> String {
    "kg".to_string()
}

/// Loads category configuration from a TOML file
///
/// # Errors
/// Returns `Error::Config` if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CatalogConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads category configuration from the default location (./config.toml),
/// returning `None` when the file does not exist.
pub fn load_default_config() -> Result<Option<CatalogConfig>> {
    let path = Path::new("config.toml");
    if !path.exists() {
        return Ok(None);
    }
    load_config(path).map(Some)
}
