use dotenvy::dotenv;
use scrap_pickup::{
    config::{Settings, catalog},
    core::catalog::seed_categories,
    errors::Result,
    state::PortalState,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Runtime settings
    let settings = Settings::from_env()
        .inspect_err(|e| error!("Critical error loading settings: {e}"))?;
    if settings.mapbox_token.is_none() {
        warn!("MAPBOX_TOKEN not set, addresses must be typed manually");
    }

    // 4. Connect and create tables
    let state = PortalState::connect(settings)
        .await
        .inspect_err(|e| error!("Failed to initialize database: {e}"))?;

    // 5. Seed the category catalog from config.toml, if present
    match catalog::load_default_config()? {
        Some(config) => {
            seed_categories(&state.db, &config)
                .await
                .inspect_err(|e| error!("Failed to seed categories: {e}"))?;
        }
        None => info!("No config.toml found, skipping category seeding"),
    }

    // 6. Log the current market board
    let board = state.market_board().await?;
    if board.is_empty() {
        info!("No market rates for {} yet", state.settings.default_location);
    }
    for entry in &board {
        info!(
            "{:<12} {:>8.2} per kg in {} on {} ({} {:+.1}%) {}",
            entry.rate.category_name.as_deref().unwrap_or("unknown"),
            entry.rate.price_per_kg,
            entry.rate.location,
            entry.rate.date,
            entry.direction().as_str(),
            entry.trend,
            entry.hint(),
        );
    }

    Ok(())
}
