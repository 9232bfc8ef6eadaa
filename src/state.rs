//! Shared portal state - Database connection, query cache and settings.
//!
//! Entry points the surrounding application calls live here. They fill in the
//! configured zone, location and history window before calling into [`crate::core`].

use crate::{
    cache::QueryCache,
    config::{Settings, database},
    core::{
        self, admin,
        booking::{self, BookingForm},
        dashboard::{self, Dashboard},
        location::MapboxGeocoder,
        market::{self, BoardEntry, MarketChart},
        roles::{self, GateDecision},
        session::AuthUser,
    },
    errors::Result,
};
use chrono::{Duration, NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// State shared by every view of the portal.
#[derive(Debug)]
pub struct PortalState {
    /// Backend connection
    pub db: DatabaseConnection,
    /// Query cache shared by the readers
    pub cache: Arc<QueryCache>,
    /// Runtime settings
    pub settings: Arc<Settings>,
}

impl PortalState {
    /// Wraps an existing connection.
    #[must_use]
    pub fn new(db: DatabaseConnection, settings: Settings) -> Self {
        let ttl = i64::try_from(settings.cache_ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        Self {
            db,
            cache: Arc::new(QueryCache::new(ttl)),
            settings: Arc::new(settings),
        }
    }

    /// Connects to `settings.database_url` and creates any missing tables.
    pub async fn connect(settings: Settings) -> Result<Self> {
        let db = database::create_connection(&settings.database_url).await?;
        database::create_tables(&db).await?;
        info!("Connected to {}", settings.database_url);
        Ok(Self::new(db, settings))
    }

    /// Today's date in the pickup zone.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        core::today(self.settings.pickup_offset)
    }

    /// Geocoder for the location picker, `None` without a token.
    pub fn geocoder(&self) -> Result<Option<MapboxGeocoder>> {
        MapboxGeocoder::from_settings(&self.settings)
    }

    /// Submits the booking form for `session`.
    pub async fn submit_booking(
        &self,
        session: Option<&AuthUser>,
        form: &mut BookingForm,
    ) -> Result<Uuid> {
        booking::submit_booking(
            &self.db,
            &self.cache,
            session,
            form,
            Utc::now(),
            self.settings.pickup_offset,
        )
        .await
    }

    /// Loads the dashboard for `session`.
    pub async fn dashboard(&self, session: Option<&AuthUser>) -> Result<Dashboard> {
        dashboard::load_dashboard(&self.db, &self.cache, session).await
    }

    /// Rate board for the default location.
    pub async fn market_board(&self) -> Result<Vec<BoardEntry>> {
        market::market_board(
            &self.db,
            &self.cache,
            &self.settings.default_location,
            self.settings.rate_history_days,
            self.today(),
        )
        .await
    }

    /// An empty rate chart for the default location.
    #[must_use]
    pub fn market_chart(&self) -> MarketChart {
        MarketChart::new(
            self.settings.default_location.as_str(),
            self.settings.rate_history_days,
        )
    }

    /// Expected payout for `weight_kg` of a category at the default location.
    pub async fn estimate_payout(&self, category_id: Uuid, weight_kg: f64) -> Result<Option<f64>> {
        market::estimate_payout(
            &self.db,
            &self.cache,
            category_id,
            &self.settings.default_location,
            weight_kg,
        )
        .await
    }

    /// Checks the admin gate for `session`.
    pub async fn admin_gate(&self, session: Option<&AuthUser>) -> GateDecision {
        roles::check_admin(&self.db, session).await
    }

    /// Adds a market rate, defaulting to the configured location and today.
    pub async fn add_market_rate(
        &self,
        access: &roles::AdminAccess,
        form: &mut admin::NewRate,
    ) -> Result<admin::RateAdded> {
        admin::add_market_rate(
            &self.db,
            &self.cache,
            access,
            form,
            &self.settings.default_location,
            self.today(),
        )
        .await
    }
}
