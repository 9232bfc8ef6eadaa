//! Shared test utilities for the pickup portal.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    cache::QueryCache,
    core::catalog,
    entities::{
        AppRole, BookingStatus, PaymentMethod, UserRole, booking, collector, market_rate,
        profile, scrap_category, transaction, user_role,
    },
    errors::Result,
};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::atomic::{AtomicI64, Ordering};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

static CLOCK: AtomicI64 = AtomicI64::new(0);

/// Strictly increasing creation timestamps, one second apart.
///
/// Rows created one after another sort in creation order even when the wall clock
/// would give them the same instant.
#[allow(clippy::unwrap_used)]
pub fn next_timestamp() -> DateTime<Utc> {
    let tick = CLOCK.fetch_add(1, Ordering::SeqCst);
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(tick)
}

/// Installs a test-writer tracing subscriber once. Honors `RUST_LOG`.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Query cache with a five minute lifetime.
pub fn test_cache() -> QueryCache {
    QueryCache::new(Duration::minutes(5))
}

/// India Standard Time (+05:30), the default pickup zone.
#[allow(clippy::unwrap_used)]
pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(330 * 60).unwrap()
}

/// Creates a test category through the catalog with unit `kg`.
pub async fn create_test_category(
    db: &DatabaseConnection,
    name: &str,
) -> Result<scrap_category::Model> {
    catalog::create_category(db, name, "kg", None, None).await
}

/// Creates a test category created `position` seconds after a fixed instant.
/// Use this when a test depends on creation order.
#[allow(clippy::unwrap_used)]
pub async fn create_test_category_at(
    db: &DatabaseConnection,
    name: &str,
    position: i64,
) -> Result<scrap_category::Model> {
    let created_at =
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() + Duration::seconds(position);
    let category = scrap_category::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        unit: Set("kg".to_string()),
        icon: Set(None),
        description: Set(None),
        created_at: Set(created_at),
    };
    Ok(category.insert(db).await?)
}

/// Creates a market rate reading.
pub async fn create_test_rate(
    db: &DatabaseConnection,
    category_id: Uuid,
    location: &str,
    date: NaiveDate,
    price_per_kg: f64,
) -> Result<market_rate::Model> {
    let rate = market_rate::ActiveModel {
        id: Set(Uuid::new_v4()),
        category_id: Set(category_id),
        location: Set(location.to_string()),
        date: Set(date),
        price_per_kg: Set(price_per_kg),
        created_at: Set(next_timestamp()),
    };
    Ok(rate.insert(db).await?)
}

/// Creates a test profile.
///
/// # Defaults
/// * `phone`: a unique `98200xxxxx` number
/// * `email`: `<name>@example.com`, lowercased with spaces removed
/// * `role`: user
/// * `wallet_balance`: 0.0
pub async fn create_test_profile(db: &DatabaseConnection, name: &str) -> Result<profile::Model> {
    let created_at = next_timestamp();
    let local_part: String = name
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    let profile = profile::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        phone: Set(format!("98200{:05}", created_at.timestamp() % 100_000)),
        email: Set(Some(format!("{local_part}@example.com"))),
        address: Set(None),
        role: Set(UserRole::User),
        wallet_balance: Set(0.0),
        created_at: Set(created_at),
        updated_at: Set(created_at),
    };
    Ok(profile.insert(db).await?)
}

/// Creates a pending booking picked up one day after creation.
pub async fn create_test_booking(
    db: &DatabaseConnection,
    user_id: Uuid,
    category_id: Uuid,
    estimated_weight: f64,
) -> Result<booking::Model> {
    let created_at = next_timestamp();
    let booking = booking::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        category_id: Set(category_id),
        estimated_weight: Set(estimated_weight),
        actual_weight: Set(None),
        final_amount: Set(None),
        pickup_address: Set("12 Marine Drive, Mumbai".to_string()),
        pickup_time: Set(created_at + Duration::days(1)),
        notes: Set(None),
        status: Set(BookingStatus::Pending),
        collector_id: Set(None),
        created_at: Set(created_at),
        updated_at: Set(created_at),
    };
    Ok(booking.insert(db).await?)
}

/// Creates a completed UPI transaction without a linked booking.
pub async fn create_test_transaction(
    db: &DatabaseConnection,
    user_id: Uuid,
    amount: f64,
) -> Result<transaction::Model> {
    let transaction = transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        booking_id: Set(None),
        amount: Set(amount),
        method: Set(PaymentMethod::Upi),
        status: Set("completed".to_string()),
        transaction_reference: Set(None),
        created_at: Set(next_timestamp()),
    };
    Ok(transaction.insert(db).await?)
}

/// Creates a collector serving Mumbai.
pub async fn create_test_collector(
    db: &DatabaseConnection,
    name: &str,
) -> Result<collector::Model> {
    let collector = collector::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        phone: Set("9810000000".to_string()),
        service_areas: Set("Mumbai".to_string()),
        earnings: Set(0.0),
        created_at: Set(next_timestamp()),
    };
    Ok(collector.insert(db).await?)
}

/// Records `role` for `user_id` in the role table.
pub async fn assign_test_role(
    db: &DatabaseConnection,
    user_id: Uuid,
    role: AppRole,
) -> Result<user_role::Model> {
    let assignment = user_role::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        role: Set(role),
        created_at: Set(next_timestamp()),
    };
    Ok(assignment.insert(db).await?)
}
