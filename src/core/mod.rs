//! Core business logic - framework-agnostic readers, writers and view state.

use chrono::{FixedOffset, NaiveDate, Utc};

/// Admin statistics, lists and rate management
pub mod admin;
/// Pickup time slots, booking form and booking submission
pub mod booking;
/// Scrap category catalog
pub mod catalog;
/// Per-user dashboard aggregation
pub mod dashboard;
/// Geocoding and the location picker
pub mod location;
/// Current market rates, history and trends
pub mod market;
/// Role lookup and the admin gate
pub mod roles;
/// Auth session observation
pub mod session;

/// Today's date in the zone at `offset`.
#[must_use]
pub fn today(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}
