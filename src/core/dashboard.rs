//! Dashboard aggregation - A user's profile, recent bookings and recent payouts.
//!
//! The reads are independent and run concurrently. Each is scoped to the signed-in
//! user and degrades to an empty value when it fails, so one broken list never
//! blanks the whole page.

use crate::{
    cache::{QueryCache, QueryKey},
    core::session::AuthUser,
    entities::{
        Booking, BookingColumn, BookingStatus, Profile, ProfileModel, ScrapCategory, Transaction,
        TransactionColumn, TransactionModel,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, QuerySelect, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Cache operation for a user's recent bookings. Keyed by user id.
pub const USER_BOOKINGS_OPERATION: &str = "user-bookings";

/// How many bookings and transactions the dashboard lists.
pub const RECENT_LIMIT: u64 = 5;

/// A booking as listed on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingSummary {
    /// Booking id
    pub id: Uuid,
    /// Category id
    pub category_id: Uuid,
    /// Category name, `None` if the category is gone
    pub category_name: Option<String>,
    /// Category icon
    pub category_icon: Option<String>,
    /// Estimated weight in kg
    pub estimated_weight: f64,
    /// Settled amount once completed
    pub final_amount: Option<f64>,
    /// Pickup address
    pub pickup_address: String,
    /// Pickup instant
    pub pickup_time: DateTime<Utc>,
    /// Current status
    pub status: BookingStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Everything the dashboard shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dashboard {
    /// The user's profile, `None` if it could not be read
    pub profile: Option<ProfileModel>,
    /// Most recent bookings, newest first
    pub bookings: Vec<BookingSummary>,
    /// Most recent transactions, newest first
    pub transactions: Vec<TransactionModel>,
    /// Sum of the listed transactions only
    pub recent_earnings: f64,
    /// Sum of every transaction the user has
    pub lifetime_earnings: f64,
    /// Number of bookings the user has made
    pub booking_count: u64,
}

impl Dashboard {
    /// Wallet balance from the profile, zero when unknown.
    #[must_use]
    pub fn wallet_balance(&self) -> f64 {
        self.profile.as_ref().map_or(0.0, |p| p.wallet_balance)
    }
}

/// The user's most recent bookings with their category.
pub async fn recent_bookings(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Vec<BookingSummary>> {
    let rows = Booking::find()
        .filter(BookingColumn::UserId.eq(user_id))
        .order_by_desc(BookingColumn::CreatedAt)
        .limit(RECENT_LIMIT)
        .find_also_related(ScrapCategory)
        .all(db)
        .await
        .map_err(Error::fetch("bookings"))?;

    Ok(rows
        .into_iter()
        .map(|(booking, category)| BookingSummary {
            id: booking.id,
            category_id: booking.category_id,
            category_name: category.as_ref().map(|c| c.name.clone()),
            category_icon: category.and_then(|c| c.icon),
            estimated_weight: booking.estimated_weight,
            final_amount: booking.final_amount,
            pickup_address: booking.pickup_address,
            pickup_time: booking.pickup_time,
            status: booking.status,
            created_at: booking.created_at,
        })
        .collect())
}

/// Recent bookings through the query cache.
pub async fn cached_recent_bookings(
    db: &DatabaseConnection,
    cache: &QueryCache,
    user_id: Uuid,
) -> Result<Vec<BookingSummary>> {
    let key = QueryKey::new(USER_BOOKINGS_OPERATION, &user_id)?;
    cache
        .get_or_fetch(key, || recent_bookings(db, user_id))
        .await
}

/// The user's most recent transactions.
pub async fn recent_transactions(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Vec<TransactionModel>> {
    Transaction::find()
        .filter(TransactionColumn::UserId.eq(user_id))
        .order_by_desc(TransactionColumn::CreatedAt)
        .limit(RECENT_LIMIT)
        .all(db)
        .await
        .map_err(Error::fetch("transactions"))
}

/// Sum of every transaction amount the user has.
pub async fn lifetime_earnings(db: &DatabaseConnection, user_id: Uuid) -> Result<f64> {
    let total: Option<Option<f64>> = Transaction::find()
        .select_only()
        .column_as(Expr::col(TransactionColumn::Amount).sum(), "total")
        .filter(TransactionColumn::UserId.eq(user_id))
        .into_tuple()
        .one(db)
        .await
        .map_err(Error::fetch("earnings"))?;
    Ok(total.flatten().unwrap_or_default())
}

/// Number of bookings the user has made.
pub async fn booking_count(db: &DatabaseConnection, user_id: Uuid) -> Result<u64> {
    Booking::find()
        .filter(BookingColumn::UserId.eq(user_id))
        .count(db)
        .await
        .map_err(Error::fetch("booking count"))
}

fn or_default<T: Default>(what: &str, result: Result<T>) -> T {
    result.unwrap_or_else(|e| {
        warn!("Dashboard {what} unavailable: {e}");
        T::default()
    })
}

/// Loads the dashboard for the signed-in user.
///
/// # Errors
/// `Error::Auth` when nobody is signed in. Read failures are logged and shown as
/// empty values.
pub async fn load_dashboard(
    db: &DatabaseConnection,
    cache: &QueryCache,
    session: Option<&AuthUser>,
) -> Result<Dashboard> {
    let user = session.ok_or(Error::Auth)?;

    let profile = async {
        Profile::find_by_id(user.id)
            .one(db)
            .await
            .map_err(Error::fetch("profile"))
    };

    let (profile, bookings, transactions, lifetime, count) = tokio::join!(
        profile,
        cached_recent_bookings(db, cache, user.id),
        recent_transactions(db, user.id),
        lifetime_earnings(db, user.id),
        booking_count(db, user.id),
    );

    let transactions = or_default("transactions", transactions);
    let recent_earnings = transactions.iter().map(|t| t.amount).sum();

    Ok(Dashboard {
        profile: or_default("profile", profile),
        bookings: or_default("bookings", bookings),
        transactions,
        recent_earnings,
        lifetime_earnings: or_default("lifetime earnings", lifetime),
        booking_count: or_default("booking count", count),
    })
}
