//! Admin business logic - Platform statistics, booking and user lists, market rates.
//!
//! Every operation takes an [`AdminAccess`] token, obtained from the role gate, so
//! platform-wide reads can't be reached without passing it.
//!
//! The four statistics are queried concurrently. A failing statistic is logged and
//! shown as zero; the others are unaffected.

use crate::{
    cache::QueryCache,
    core::{
        market::{self, CurrentRate},
        roles::AdminAccess,
    },
    entities::{
        AppRole, Booking, BookingColumn, BookingStatus, Collector, MarketRate, MarketRateColumn,
        Profile, ProfileColumn, ProfileModel, ScrapCategory, Transaction, TransactionColumn,
        UserRoleColumn, UserRoleEntity, UserRoleModel, market_rate, user_role,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*, sea_query::Expr};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{error, info, warn};

/// How many bookings the admin booking list shows.
pub const RECENT_BOOKINGS_LIMIT: u64 = 10;
/// How many profiles the admin user list shows.
pub const USER_LIST_LIMIT: u64 = 20;

/// Platform-wide counters shown on the admin page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PlatformStats {
    /// Number of profiles
    pub total_users: u64,
    /// Number of bookings
    pub total_bookings: u64,
    /// Sum of every transaction amount
    pub total_revenue: f64,
    /// Number of registered collectors
    pub active_collectors: u64,
}

fn or_zero<T: Default>(stat: &str, result: std::result::Result<T, DbErr>) -> T {
    result.unwrap_or_else(|e| {
        error!("Failed to load {stat}: {e}");
        T::default()
    })
}

/// Sum of every transaction amount in storage.
pub async fn total_revenue(db: &DatabaseConnection) -> std::result::Result<f64, DbErr> {
    let total: Option<Option<f64>> = Transaction::find()
        .select_only()
        .column_as(Expr::col(TransactionColumn::Amount).sum(), "total")
        .into_tuple()
        .one(db)
        .await?;
    Ok(total.flatten().unwrap_or_default())
}

/// Loads the four platform statistics concurrently.
pub async fn platform_stats(db: &DatabaseConnection, _access: &AdminAccess) -> PlatformStats {
    let (users, bookings, revenue, collectors) = tokio::join!(
        Profile::find().count(db),
        Booking::find().count(db),
        total_revenue(db),
        Collector::find().count(db),
    );

    PlatformStats {
        total_users: or_zero("user count", users),
        total_bookings: or_zero("booking count", bookings),
        total_revenue: or_zero("revenue", revenue),
        active_collectors: or_zero("collector count", collectors),
    }
}

/// A booking as listed for admins, with its owner and category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminBooking {
    /// Booking id
    pub id: Uuid,
    /// Owner's display name
    pub user_name: Option<String>,
    /// Owner's phone number
    pub user_phone: Option<String>,
    /// Category name
    pub category_name: Option<String>,
    /// Estimated weight in kg
    pub estimated_weight: f64,
    /// Pickup address
    pub pickup_address: String,
    /// Pickup instant
    pub pickup_time: DateTime<Utc>,
    /// Current status
    pub status: BookingStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// The most recent bookings on the platform, newest first.
pub async fn recent_bookings(
    db: &DatabaseConnection,
    _access: &AdminAccess,
) -> Result<Vec<AdminBooking>> {
    let rows = Booking::find()
        .order_by_desc(BookingColumn::CreatedAt)
        .limit(RECENT_BOOKINGS_LIMIT)
        .find_also_related(ScrapCategory)
        .all(db)
        .await
        .map_err(Error::fetch("bookings"))?;

    let owner_ids: Vec<Uuid> = rows.iter().map(|(b, _)| b.user_id).collect();
    let owners: HashMap<Uuid, ProfileModel> = if owner_ids.is_empty() {
        HashMap::new()
    } else {
        Profile::find()
            .filter(ProfileColumn::Id.is_in(owner_ids))
            .all(db)
            .await
            .map_err(Error::fetch("booking owners"))?
            .into_iter()
            .map(|p| (p.id, p))
            .collect()
    };

    Ok(rows
        .into_iter()
        .map(|(booking, category)| {
            let owner = owners.get(&booking.user_id);
            AdminBooking {
                id: booking.id,
                user_name: owner.map(|p| p.name.clone()),
                user_phone: owner.map(|p| p.phone.clone()),
                category_name: category.map(|c| c.name),
                estimated_weight: booking.estimated_weight,
                pickup_address: booking.pickup_address,
                pickup_time: booking.pickup_time,
                status: booking.status,
                created_at: booking.created_at,
            }
        })
        .collect())
}

/// Every market rate reading, newest date first.
pub async fn list_market_rates(
    db: &DatabaseConnection,
    _access: &AdminAccess,
) -> Result<Vec<CurrentRate>> {
    let rows = MarketRate::find()
        .order_by_desc(MarketRateColumn::Date)
        .order_by_desc(MarketRateColumn::CreatedAt)
        .find_also_related(ScrapCategory)
        .all(db)
        .await
        .map_err(Error::fetch("market rates"))?;
    Ok(market::with_category(rows))
}

/// The most recently created profiles, newest first.
pub async fn list_users(
    db: &DatabaseConnection,
    _access: &AdminAccess,
) -> Result<Vec<ProfileModel>> {
    Profile::find()
        .order_by_desc(ProfileColumn::CreatedAt)
        .limit(USER_LIST_LIMIT)
        .all(db)
        .await
        .map_err(Error::fetch("users"))
}

/// Input of the add-rate form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRate {
    /// Category id
    pub category_id: String,
    /// Price per kg
    pub price_per_kg: String,
    /// Location, blank for the default location
    pub location: String,
    /// Day of the reading, `None` for today
    pub date: Option<NaiveDate>,
}

impl NewRate {
    /// An empty form preset to `location`.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            category_id: String::new(),
            price_per_kg: String::new(),
            location: location.into(),
            date: None,
        }
    }
}

/// Result of a successful rate insert.
#[derive(Debug, Clone, PartialEq)]
pub struct RateAdded {
    /// The stored reading
    pub rate: market_rate::Model,
    /// The reloaded rate list
    pub rates: Vec<CurrentRate>,
}

/// Validates `form` and stores a new market rate reading.
///
/// Category and price are required and the price must be a positive number. A blank
/// location falls back to `default_location` and a missing date to `today`. On
/// success the cached market data is dropped, the form is reset to
/// `default_location` and the rate list is reloaded. On failure the form is kept.
pub async fn add_market_rate(
    db: &DatabaseConnection,
    cache: &QueryCache,
    access: &AdminAccess,
    form: &mut NewRate,
    default_location: &str,
    today: NaiveDate,
) -> Result<RateAdded> {
    let mut missing = Vec::new();
    if form.category_id.trim().is_empty() {
        missing.push("category");
    }
    if form.price_per_kg.trim().is_empty() {
        missing.push("price per kg");
    }
    if !missing.is_empty() {
        return Err(Error::MissingFields { fields: missing });
    }

    let category_id = Uuid::parse_str(form.category_id.trim()).map_err(|e| Error::Validation {
        field: "category",
        message: e.to_string(),
    })?;
    let price_per_kg = form
        .price_per_kg
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p > 0.0)
        .ok_or_else(|| Error::Validation {
            field: "price per kg",
            message: format!("{:?} is not a positive number", form.price_per_kg),
        })?;
    let location = match form.location.trim() {
        "" => default_location.to_string(),
        given => given.to_string(),
    };

    let rate = market_rate::ActiveModel {
        id: Set(Uuid::new_v4()),
        category_id: Set(category_id),
        location: Set(location),
        date: Set(form.date.unwrap_or(today)),
        price_per_kg: Set(price_per_kg),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .map_err(|e| {
        warn!("Market rate insert rejected: {e}");
        Error::write(&e)
    })?;

    info!(
        "Added rate {} for {} at {}: {}/kg on {}",
        rate.id, rate.category_id, rate.location, rate.price_per_kg, rate.date
    );

    cache
        .invalidate_operation(market::CURRENT_RATES_OPERATION)
        .await;
    cache
        .invalidate_operation(market::RATE_HISTORY_OPERATION)
        .await;
    *form = NewRate::new(default_location);

    let rates = list_market_rates(db, access).await.unwrap_or_else(|e| {
        warn!("Rate list reload failed: {e}");
        Vec::new()
    });
    Ok(RateAdded { rate, rates })
}

/// Assigns `role` to `user_id`, replacing any previous assignment.
pub async fn assign_role(
    db: &DatabaseConnection,
    access: &AdminAccess,
    user_id: Uuid,
    role: AppRole,
) -> Result<UserRoleModel> {
    let existing = UserRoleEntity::find()
        .filter(UserRoleColumn::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(Error::fetch("user role"))?;

    let saved = match existing {
        Some(row) => {
            let mut row: user_role::ActiveModel = row.into();
            row.role = Set(role);
            row.update(db).await
        }
        None => {
            user_role::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                role: Set(role),
                created_at: Set(Utc::now()),
            }
            .insert(db)
            .await
        }
    }
    .map_err(|e| Error::write(&e))?;

    info!(
        "{} assigned role {:?} to {user_id}",
        access.user_id(),
        saved.role
    );
    Ok(saved)
}
