//! Unified error types for the pickup portal.
//!
//! Local precondition failures (`MissingFields`, `Validation`, `Auth`) are raised
//! before any backend call. Backend failures are wrapped as `DataFetch` for reads
//! and `Write` for inserts so the caller can decide between degrading to an empty
//! view and preserving user input for a retry.

use sea_orm::DbErr;
use thiserror::Error;

/// All errors produced by the portal.
#[derive(Debug, Error)]
pub enum Error {
    /// One or more required form fields were left empty
    #[error("Please fill in: {}", fields.join(", "))]
    MissingFields {
        /// Names of the missing fields, in form order
        fields: Vec<&'static str>,
    },

    /// A field was present but could not be interpreted
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Name of the offending field
        field: &'static str,
        /// Human-readable explanation
        message: String,
    },

    /// An operation that needs a signed-in user was attempted without one
    #[error("Please login to continue")]
    Auth,

    /// The signed-in user lacks the role required for this view
    #[error("Access denied: {message}")]
    AccessDenied {
        /// Explanation shown to the user
        message: String,
    },

    /// A backend read failed
    #[error("Failed to load {what}: {message}")]
    DataFetch {
        /// What was being loaded (e.g. "bookings")
        what: &'static str,
        /// Backend error message
        message: String,
    },

    /// A backend write was rejected
    #[error("Failed to save: {message}")]
    Write {
        /// Backend error message
        message: String,
    },

    /// The geocoding provider failed or returned no match
    #[error("Geocoding error: {message}")]
    Geocode {
        /// Provider error message
        message: String,
    },

    /// Configuration could not be loaded
    #[error("Configuration error: {message}")]
    Config {
        /// Explanation of what is misconfigured
        message: String,
    },

    /// Raw database error (schema setup, connection)
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// HTTP transport error talking to an external provider
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Cache payload (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Builds a mapper turning a backend read error into `DataFetch`.
    pub fn fetch(what: &'static str) -> impl FnOnce(DbErr) -> Self {
        move |e| Self::DataFetch {
            what,
            message: e.to_string(),
        }
    }

    /// Turns a backend write error into `Write`.
    #[must_use]
    pub fn write(e: &DbErr) -> Self {
        Self::Write {
            message: e.to_string(),
        }
    }

    /// True for errors raised by local field validation.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::MissingFields { .. } | Self::Validation { .. })
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
