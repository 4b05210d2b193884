// Recibo server entry point

use std::sync::Arc;

use anyhow::{Context, Result};

use recibo::config::{self, ScanConfig};
use recibo::database::DatabaseManager;
use recibo::rate_limit::{InMemoryCounterStore, RateLimiter};
use recibo::scan::ScanService;
use recibo::server;
use recibo::state::AppState;
use recibo::vision::groq::GroqVisionProvider;
use recibo::vision::resilience::ResilientVision;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ScanConfig::from_env()?;
    let db = Arc::new(DatabaseManager::new(config::database_path())?);

    let provider = ResilientVision::new(
        GroqVisionProvider::new(&config)?,
        config.max_retries,
        config.breaker_threshold,
        config.breaker_cooldown,
    );
    let limiter = RateLimiter::new(
        Box::new(InMemoryCounterStore::new()),
        config.minute_cap,
        config.daily_cap,
    );
    let scanner = Arc::new(ScanService::new(Arc::new(provider), limiter, db.clone()));

    let state = AppState::new(db, scanner);
    let addr = config::bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    log::info!("Recibo server listening on {}", addr);

    axum::serve(listener, server::router(state))
        .await
        .context("Server error")?;
    Ok(())
}
