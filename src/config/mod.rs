/// Database connection and table creation
pub mod database;

/// Scrap category seed loading from config.toml
pub mod catalog;

/// Runtime settings from environment variables
pub mod settings;

pub use settings::Settings;
