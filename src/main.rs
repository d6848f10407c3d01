//! Parenting Tips Service - Binary Entrypoint
//! Boots the Axum HTTP server, wiring config, the tips cache, and metrics.

use parenting_tips::{api, app_state, config::load_tips_config_default, telemetry::Metrics};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("parenting_tips=info,tips=info,warn"));

    // try_init: Shuttle may already have installed a global subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = load_tips_config_default()?;
    let state = app_state(&cfg)?;
    let metrics = Metrics::init(cfg.cache.ttl_secs)?;

    let router = api::router(state).merge(metrics.router());
    tracing::info!("Parenting tips service started successfully");

    Ok(router.into())
}
