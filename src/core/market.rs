//! Market rate business logic - Current prices, price history and trends.
//!
//! Current rates come back newest first, one row per reading; the rate board
//! shows [`latest_per_category`] of them. History is ascending by date within a
//! day window ending today.
//!
//! The trend is a point-to-point comparison of the oldest and newest reading in the
//! window, not a regression:
//!
//! `trend = (newest - oldest) / oldest * 100`, and 0 when there are fewer than two
//! readings or the oldest price is 0.

use crate::{
    cache::{LatestOnly, QueryCache, QueryKey},
    entities::{MarketRate, ScrapCategory, market_rate, scrap_category},
    errors::{Error, Result},
};
use chrono::{Days, NaiveDate};
use sea_orm::{QueryOrder, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// Cache operation name for current rates.
pub const CURRENT_RATES_OPERATION: &str = "market-rates";
/// Cache operation name for rate history.
pub const RATE_HISTORY_OPERATION: &str = "market-rate-history";

/// A rate reading joined with its category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentRate {
    /// Id of the reading
    pub rate_id: Uuid,
    /// Priced category
    pub category_id: Uuid,
    /// Category name, `None` if the category no longer exists
    pub category_name: Option<String>,
    /// Category icon
    pub category_icon: Option<String>,
    /// Location of the reading
    pub location: String,
    /// Price per kg
    pub price_per_kg: f64,
    /// Day of the reading
    pub date: NaiveDate,
}

/// One point of a price history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatePoint {
    /// Day of the reading
    pub date: NaiveDate,
    /// Price per kg
    pub price_per_kg: f64,
}

impl From<market_rate::Model> for RatePoint {
    fn from(rate: market_rate::Model) -> Self {
        Self {
            date: rate.date,
            price_per_kg: rate.price_per_kg,
        }
    }
}

/// Direction of a price trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    /// Newest price above oldest
    Rising,
    /// Newest price below oldest
    Falling,
    /// No change
    Stable,
}

impl TrendDirection {
    /// Classifies a trend percentage.
    #[must_use]
    pub fn from_percent(trend: f64) -> Self {
        if trend > 0.0 {
            Self::Rising
        } else if trend < 0.0 {
            Self::Falling
        } else {
            Self::Stable
        }
    }

    /// Lowercase label ("rising", "falling", "stable").
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rising => "rising",
            Self::Falling => "falling",
            Self::Stable => "stable",
        }
    }
}

/// Retrieves every reading at `location`, newest date first, joined with its category.
pub async fn current_rates(db: &DatabaseConnection, location: &str) -> Result<Vec<CurrentRate>> {
    let rows = MarketRate::find()
        .filter(market_rate::Column::Location.eq(location))
        .order_by_desc(market_rate::Column::Date)
        .order_by_desc(market_rate::Column::CreatedAt)
        .find_also_related(ScrapCategory)
        .all(db)
        .await
        .map_err(Error::fetch("market rates"))?;

    Ok(with_category(rows))
}

/// Flattens readings joined with their (possibly missing) category.
pub(crate) fn with_category(
    rows: Vec<(market_rate::Model, Option<scrap_category::Model>)>,
) -> Vec<CurrentRate> {
    rows.into_iter()
        .map(|(rate, category)| CurrentRate {
            rate_id: rate.id,
            category_id: rate.category_id,
            category_name: category.as_ref().map(|c| c.name.clone()),
            category_icon: category.and_then(|c| c.icon),
            location: rate.location,
            price_per_kg: rate.price_per_kg,
            date: rate.date,
        })
        .collect()
}

/// Keeps the first (most recent) reading per category, preserving order.
#[must_use]
pub fn latest_per_category(rates: &[CurrentRate]) -> Vec<CurrentRate> {
    let mut seen = HashSet::new();
    rates
        .iter()
        .filter(|rate| seen.insert(rate.category_id))
        .cloned()
        .collect()
}

/// Retrieves readings for one category and location with `date >= today - window_days`,
/// ascending by date.
pub async fn rate_history(
    db: &DatabaseConnection,
    category_id: Uuid,
    location: &str,
    window_days: u32,
    today: NaiveDate,
) -> Result<Vec<RatePoint>> {
    let since = today
        .checked_sub_days(Days::new(u64::from(window_days)))
        .unwrap_or(NaiveDate::MIN);

    let rows = MarketRate::find()
        .filter(market_rate::Column::CategoryId.eq(category_id))
        .filter(market_rate::Column::Location.eq(location))
        .filter(market_rate::Column::Date.gte(since))
        .order_by_asc(market_rate::Column::Date)
        .order_by_asc(market_rate::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Error::fetch("rate history"))?;

    Ok(rows.into_iter().map(RatePoint::from).collect())
}

/// Cached variant of [`current_rates`], keyed by location.
pub async fn cached_current_rates(
    db: &DatabaseConnection,
    cache: &QueryCache,
    location: &str,
) -> Result<Vec<CurrentRate>> {
    let key = QueryKey::new(CURRENT_RATES_OPERATION, &location)?;
    cache
        .get_or_fetch(key, || current_rates(db, location))
        .await
}

/// Cache key for a history query.
pub fn history_key(
    category_id: Uuid,
    location: &str,
    window_days: u32,
    today: NaiveDate,
) -> Result<QueryKey> {
    QueryKey::new(
        RATE_HISTORY_OPERATION,
        &(category_id, location, window_days, today),
    )
}

/// Cached variant of [`rate_history`], keyed by the full parameter tuple.
pub async fn cached_rate_history(
    db: &DatabaseConnection,
    cache: &QueryCache,
    category_id: Uuid,
    location: &str,
    window_days: u32,
    today: NaiveDate,
) -> Result<Vec<RatePoint>> {
    let key = history_key(category_id, location, window_days, today)?;
    cache
        .get_or_fetch(key, || {
            rate_history(db, category_id, location, window_days, today)
        })
        .await
}

/// Percentage change from the first to the last point of an ascending history.
#[must_use]
pub fn trend_percent(history: &[RatePoint]) -> f64 {
    let (Some(oldest), Some(newest)) = (history.first(), history.last()) else {
        return 0.0;
    };
    if history.len() < 2 || oldest.price_per_kg == 0.0 {
        return 0.0;
    }

    let trend = (newest.price_per_kg - oldest.price_per_kg) / oldest.price_per_kg * 100.0;
    if trend.is_finite() { trend } else { 0.0 }
}

/// Short advice shown next to a trend.
#[must_use]
pub fn selling_hint(trend: f64) -> &'static str {
    if trend > 5.0 {
        "Great time to sell!"
    } else if trend > 0.0 {
        "Consider selling soon."
    } else {
        "Monitor for better rates."
    }
}

/// Bar heights (0-100) for a history chart, relative to the highest price.
#[must_use]
pub fn chart_bars(history: &[RatePoint]) -> Vec<f64> {
    let max = history
        .iter()
        .map(|p| p.price_per_kg)
        .fold(0.0_f64, f64::max);
    history
        .iter()
        .map(|p| {
            if max > 0.0 {
                p.price_per_kg / max * 100.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Expected payout for `weight_kg` of a category at the latest price at `location`.
///
/// Returns `None` when no reading exists for the category.
pub async fn estimate_payout(
    db: &DatabaseConnection,
    cache: &QueryCache,
    category_id: Uuid,
    location: &str,
    weight_kg: f64,
) -> Result<Option<f64>> {
    let rates = cached_current_rates(db, cache, location).await?;
    Ok(rates
        .iter()
        .find(|rate| rate.category_id == category_id)
        .map(|rate| rate.price_per_kg * weight_kg))
}

/// One row of the rate board: the latest reading of a category and its trend.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardEntry {
    /// Latest reading
    pub rate: CurrentRate,
    /// Trend over the history window
    pub trend: f64,
}

impl BoardEntry {
    /// Direction of [`BoardEntry::trend`].
    #[must_use]
    pub fn direction(&self) -> TrendDirection {
        TrendDirection::from_percent(self.trend)
    }

    /// Selling hint for [`BoardEntry::trend`].
    #[must_use]
    pub fn hint(&self) -> &'static str {
        selling_hint(self.trend)
    }
}

/// Latest reading and trend for every category priced at `location`.
///
/// A category whose history cannot be read gets a trend of 0.
pub async fn market_board(
    db: &DatabaseConnection,
    cache: &QueryCache,
    location: &str,
    window_days: u32,
    today: NaiveDate,
) -> Result<Vec<BoardEntry>> {
    let latest = latest_per_category(&cached_current_rates(db, cache, location).await?);

    let mut board = Vec::with_capacity(latest.len());
    for rate in latest {
        let history =
            cached_rate_history(db, cache, rate.category_id, location, window_days, today).await;
        let trend = match history {
            Ok(history) => trend_percent(&history),
            Err(e) => {
                warn!("No trend for {}: {e}", rate.category_id);
                0.0
            }
        };
        board.push(BoardEntry { rate, trend });
    }
    Ok(board)
}

/// State of the rate chart: selected category and its displayed history.
#[derive(Debug)]
pub struct MarketChart {
    location: String,
    window_days: u32,
    selected: Option<Uuid>,
    history: LatestOnly<Vec<RatePoint>>,
}

impl MarketChart {
    /// Creates a chart for `location` showing `window_days` of history.
    #[must_use]
    pub fn new(location: impl Into<String>, window_days: u32) -> Self {
        Self {
            location: location.into(),
            window_days,
            selected: None,
            history: LatestOnly::new(),
        }
    }

    /// Selects a category and returns the key its history response must carry.
    pub fn select_category(&mut self, category_id: Uuid, today: NaiveDate) -> Result<QueryKey> {
        let key = history_key(category_id, &self.location, self.window_days, today)?;
        self.selected = Some(category_id);
        self.history.select(key.clone());
        Ok(key)
    }

    /// Applies a history response. Responses for a no-longer-selected key are dropped.
    pub fn apply(&mut self, key: &QueryKey, history: Vec<RatePoint>) -> bool {
        self.history.apply(key, history)
    }

    /// Selects `category_id`, fetches its history and displays it.
    ///
    /// A failed fetch leaves an empty chart.
    pub async fn load(
        &mut self,
        db: &DatabaseConnection,
        cache: &QueryCache,
        category_id: Uuid,
        today: NaiveDate,
    ) -> Result<()> {
        let key = self.select_category(category_id, today)?;
        let history = match cached_rate_history(
            db,
            cache,
            category_id,
            &self.location,
            self.window_days,
            today,
        )
        .await
        {
            Ok(history) => history,
            Err(e) => {
                warn!("Rate history unavailable for {category_id}: {e}");
                Vec::new()
            }
        };
        self.apply(&key, history);
        Ok(())
    }

    /// Selected category.
    #[must_use]
    pub const fn selected(&self) -> Option<Uuid> {
        self.selected
    }

    /// Displayed history, empty while loading.
    #[must_use]
    pub fn history(&self) -> &[RatePoint] {
        self.history.value().map_or(&[], Vec::as_slice)
    }

    /// Trend of the displayed history.
    #[must_use]
    pub fn trend(&self) -> f64 {
        trend_percent(self.history())
    }

    /// Bar heights of the displayed history.
    #[must_use]
    pub fn bars(&self) -> Vec<f64> {
        chart_bars(self.history())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use tokio::sync::oneshot;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn points(prices: &[f64]) -> Vec<RatePoint> {
        prices
            .iter()
            .zip(1..)
            .map(|(&price_per_kg, d)| RatePoint {
                date: day(d),
                price_per_kg,
            })
            .collect()
    }

    #[test]
    fn test_trend_is_first_to_last_change() {
        let history = points(&[12.0, 13.0, 14.0, 13.0, 15.0, 14.0, 15.0]);
        assert_eq!(trend_percent(&history), 25.0);

        let falling = points(&[20.0, 15.0]);
        assert_eq!(trend_percent(&falling), -25.0);
    }

    #[test]
    fn test_trend_short_history_is_zero() {
        assert_eq!(trend_percent(&[]), 0.0);
        assert_eq!(trend_percent(&points(&[42.0])), 0.0);
    }

    #[test]
    fn test_trend_zero_oldest_price_is_zero() {
        assert_eq!(trend_percent(&points(&[0.0, 10.0])), 0.0);
    }

    #[test]
    fn test_trend_direction_and_hint() {
        assert_eq!(TrendDirection::from_percent(8.5), TrendDirection::Rising);
        assert_eq!(TrendDirection::from_percent(-2.1), TrendDirection::Falling);
        assert_eq!(TrendDirection::from_percent(0.0).as_str(), "stable");
        assert_eq!(selling_hint(8.5), "Great time to sell!");
        assert_eq!(selling_hint(5.0), "Consider selling soon.");
        assert_eq!(selling_hint(-2.1), "Monitor for better rates.");
    }

    #[test]
    fn test_chart_bars_relative_to_max() {
        assert_eq!(chart_bars(&points(&[5.0, 10.0, 2.5])), vec![50.0, 100.0, 25.0]);
        assert_eq!(chart_bars(&points(&[0.0, 0.0])), vec![0.0, 0.0]);
        assert!(chart_bars(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_current_rates_newest_first_and_deduplicated() -> Result<()> {
        let db = setup_test_db().await?;
        let paper = create_test_category(&db, "Paper").await?;
        let metal = create_test_category(&db, "Metal").await?;

        create_test_rate(&db, paper.id, "Mumbai", day(1), 12.0).await?;
        create_test_rate(&db, paper.id, "Mumbai", day(3), 14.0).await?;
        create_test_rate(&db, metal.id, "Mumbai", day(2), 85.0).await?;
        create_test_rate(&db, metal.id, "Pune", day(3), 80.0).await?;

        let rates = current_rates(&db, "Mumbai").await?;
        let dates: Vec<NaiveDate> = rates.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(3), day(2), day(1)]);
        assert_eq!(rates[0].category_name.as_deref(), Some("Paper"));

        let latest = latest_per_category(&rates);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].price_per_kg, 14.0);
        assert_eq!(latest[1].price_per_kg, 85.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_rate_history_window_and_order() -> Result<()> {
        let db = setup_test_db().await?;
        let paper = create_test_category(&db, "Paper").await?;

        create_test_rate(&db, paper.id, "Mumbai", day(10), 15.0).await?;
        create_test_rate(&db, paper.id, "Mumbai", day(1), 9.0).await?;
        create_test_rate(&db, paper.id, "Mumbai", day(5), 12.0).await?;
        create_test_rate(&db, paper.id, "Mumbai", day(3), 10.0).await?;
        create_test_rate(&db, paper.id, "Pune", day(6), 99.0).await?;

        let history = rate_history(&db, paper.id, "Mumbai", 7, day(10)).await?;
        let dates: Vec<NaiveDate> = history.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(3), day(5), day(10)]);
        assert_eq!(trend_percent(&history), 50.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_oversized_window_reads_all_history() -> Result<()> {
        let db = setup_test_db().await?;
        let glass = create_test_category(&db, "Glass").await?;
        create_test_rate(&db, glass.id, "Mumbai", day(1), 2.0).await?;
        create_test_rate(&db, glass.id, "Mumbai", day(9), 3.0).await?;

        let history = rate_history(&db, glass.id, "Mumbai", u32::MAX, day(10)).await?;
        assert_eq!(history.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_history_cache_is_keyed_per_category() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = test_cache();
        let paper = create_test_category(&db, "Paper").await?;
        let metal = create_test_category(&db, "Metal").await?;
        create_test_rate(&db, paper.id, "Mumbai", day(9), 14.0).await?;
        create_test_rate(&db, metal.id, "Mumbai", day(9), 85.0).await?;

        let paper_history = cached_rate_history(&db, &cache, paper.id, "Mumbai", 7, day(10)).await?;
        let metal_history = cached_rate_history(&db, &cache, metal.id, "Mumbai", 7, day(10)).await?;
        assert_eq!(paper_history[0].price_per_kg, 14.0);
        assert_eq!(metal_history[0].price_per_kg, 85.0);
        assert_eq!(cache.len().await, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_market_board_pairs_latest_rate_with_trend() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = test_cache();
        let paper = create_test_category(&db, "Paper").await?;
        let metal = create_test_category(&db, "Metal").await?;
        create_test_rate(&db, paper.id, "Mumbai", day(4), 10.0).await?;
        create_test_rate(&db, paper.id, "Mumbai", day(9), 11.0).await?;
        create_test_rate(&db, metal.id, "Mumbai", day(8), 80.0).await?;

        let board = market_board(&db, &cache, "Mumbai", 7, day(10)).await?;
        assert_eq!(board.len(), 2);

        assert_eq!(board[0].rate.category_id, paper.id);
        assert_eq!(board[0].rate.price_per_kg, 11.0);
        assert!((board[0].trend - 10.0).abs() < 1e-9);
        assert_eq!(board[0].direction(), TrendDirection::Rising);
        assert_eq!(board[0].hint(), "Great time to sell!");

        assert_eq!(board[1].trend, 0.0);
        assert_eq!(board[1].direction(), TrendDirection::Stable);
        Ok(())
    }

    #[tokio::test]
    async fn test_estimate_payout_uses_latest_price() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = test_cache();
        let metal = create_test_category(&db, "Metal").await?;
        let glass = create_test_category(&db, "Glass").await?;
        create_test_rate(&db, metal.id, "Mumbai", day(1), 80.0).await?;
        create_test_rate(&db, metal.id, "Mumbai", day(2), 85.0).await?;

        let payout = estimate_payout(&db, &cache, metal.id, "Mumbai", 10.0).await?;
        assert_eq!(payout, Some(850.0));
        assert_eq!(
            estimate_payout(&db, &cache, glass.id, "Mumbai", 10.0).await?,
            None
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_chart_load_displays_selected_category() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = test_cache();
        let paper = create_test_category(&db, "Paper").await?;
        create_test_rate(&db, paper.id, "Mumbai", day(8), 10.0).await?;
        create_test_rate(&db, paper.id, "Mumbai", day(9), 11.0).await?;

        let mut chart = MarketChart::new("Mumbai", 7);
        chart.load(&db, &cache, paper.id, day(10)).await?;
        assert_eq!(chart.selected(), Some(paper.id));
        assert_eq!(chart.history().len(), 2);
        assert!((chart.trend() - 10.0).abs() < 1e-9);
        assert_eq!(chart.bars().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_switching_category_ignores_late_response() -> Result<()> {
        let paper = Uuid::from_u128(1);
        let metal = Uuid::from_u128(2);
        let mut chart = MarketChart::new("Mumbai", 7);

        let (paper_tx, paper_rx) = oneshot::channel::<Vec<RatePoint>>();
        let (metal_tx, metal_rx) = oneshot::channel::<Vec<RatePoint>>();

        let paper_key = chart.select_category(paper, day(10))?;
        // User switches before the paper history arrives
        let metal_key = chart.select_category(metal, day(10))?;

        // Metal resolves first, paper arrives late
        metal_tx.send(points(&[80.0, 85.0])).unwrap();
        paper_tx.send(points(&[12.0, 14.0])).unwrap();

        let (metal_history, paper_history) = tokio::join!(metal_rx, paper_rx);
        assert!(chart.apply(&metal_key, metal_history.unwrap()));
        assert!(!chart.apply(&paper_key, paper_history.unwrap()));

        assert_eq!(chart.selected(), Some(metal));
        assert_eq!(chart.history(), points(&[80.0, 85.0]).as_slice());
        Ok(())
    }

    #[tokio::test]
    async fn test_stale_response_before_new_one_is_also_ignored() -> Result<()> {
        let mut chart = MarketChart::new("Mumbai", 7);
        let paper_key = chart.select_category(Uuid::from_u128(1), day(10))?;
        let metal_key = chart.select_category(Uuid::from_u128(2), day(10))?;

        // Paper arrives first but is no longer selected
        assert!(!chart.apply(&paper_key, points(&[12.0, 14.0])));
        assert!(chart.history().is_empty());

        assert!(chart.apply(&metal_key, points(&[80.0, 85.0])));
        assert_eq!(chart.history().len(), 2);
        Ok(())
    }
}
