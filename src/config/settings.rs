//! Runtime settings read from environment variables.
//!
//! Every value has a default except `MAPBOX_TOKEN`; without a token geocoding is
//! disabled and users type their address manually.

use crate::errors::{Error, Result};
use chrono::FixedOffset;
use std::{fmt::Display, str::FromStr};
use tracing::info;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/scrap_pickup.sqlite?mode=rwc";

/// Longest rate history window accepted from the environment.
pub const MAX_RATE_HISTORY_DAYS: u32 = 3650;

/// Application settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// SeaORM connection URL
    pub database_url: String,
    /// Mapbox access token for geocoding
    pub mapbox_token: Option<String>,
    /// Location used for market rates when none is chosen
    pub default_location: String,
    /// Country filter for forward geocoding
    pub geocoder_country: String,
    /// Zone in which a booking's date and time slot are interpreted
    pub pickup_offset: FixedOffset,
    /// Days of history shown on the rate chart
    pub rate_history_days: u32,
    /// Lifetime of a query cache entry in seconds
    pub cache_ttl_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            mapbox_token: None,
            default_location: "Mumbai".to_string(),
            geocoder_country: "IN".to_string(),
            pickup_offset: ist(),
            rate_history_days: 7,
            cache_ttl_seconds: 300,
        }
    }
}

// +05:30 is always in range.
#[allow(clippy::unwrap_used)]
fn ist() -> FixedOffset {
    FixedOffset::east_opt(330 * 60).unwrap()
}

impl Settings {
    /// Loads settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let offset_minutes: i32 = try_load(&lookup, "PICKUP_UTC_OFFSET_MINUTES", 330)?;
        let pickup_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| Error::Config {
                message: format!("PICKUP_UTC_OFFSET_MINUTES out of range: {offset_minutes}"),
            })?;

        let rate_history_days =
            try_load(&lookup, "RATE_HISTORY_DAYS", defaults.rate_history_days)?;
        if rate_history_days > MAX_RATE_HISTORY_DAYS {
            return Err(Error::Config {
                message: format!("RATE_HISTORY_DAYS too large: {rate_history_days}"),
            });
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            mapbox_token: lookup("MAPBOX_TOKEN").filter(|t| !t.trim().is_empty()),
            default_location: lookup("DEFAULT_LOCATION").unwrap_or(defaults.default_location),
            geocoder_country: lookup("GEOCODER_COUNTRY").unwrap_or(defaults.geocoder_country),
            pickup_offset,
            rate_history_days,
            cache_ttl_seconds: try_load(&lookup, "CACHE_TTL_SECONDS", defaults.cache_ttl_seconds)?,
        })
    }
}

fn try_load<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e| Error::Config {
            message: format!("Invalid {key} value {raw:?}: {e}"),
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
