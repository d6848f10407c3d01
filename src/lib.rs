// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cache;
pub mod classify;
pub mod config;
pub mod ingest;
pub mod model;
pub mod query;
pub mod telemetry;

pub use crate::api::{router, AppState};
pub use crate::cache::CacheManager;
pub use crate::classify::{Category, Classifier};
pub use crate::model::{CacheSnapshot, ContentItem};
pub use crate::query::{QueryError, TipsQuery};

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use crate::config::TipsConfig;
use crate::ingest::providers::fixture::{FixtureClient, ENV_TIPS_SOURCE_FIXTURE};
use crate::ingest::providers::reddit::RedditClient;
use crate::ingest::types::SourceClient;
use crate::ingest::Aggregator;

/// Pick the source client: `$TIPS_SOURCE_FIXTURE` if set, otherwise Reddit.
/// Returns `(client, ready)`; `ready` is false when Reddit credentials are missing,
/// in which case an empty client is used and `/health` reports 503.
pub fn source_client_from_env() -> anyhow::Result<(Arc<dyn SourceClient>, bool)> {
    if let Ok(p) = std::env::var(ENV_TIPS_SOURCE_FIXTURE) {
        let client: Arc<dyn SourceClient> =
            Arc::new(FixtureClient::from_path(&PathBuf::from(p))?);
        info!("Using fixture source client");
        return Ok((client, true));
    }
    match RedditClient::from_env() {
        Ok(client) => {
            let client: Arc<dyn SourceClient> = Arc::new(client);
            Ok((client, true))
        }
        Err(e) => {
            // keep serving; /health reports the missing client
            error!(error = %e, "Failed to initialize Reddit");
            let empty: Arc<dyn SourceClient> = Arc::new(FixtureClient::default());
            Ok((empty, false))
        }
    }
}

/// Build the shared state (one cache per process) from config + environment.
pub fn app_state(cfg: &TipsConfig) -> anyhow::Result<AppState> {
    let (client, ready) = source_client_from_env()?;
    let aggregator = Aggregator::new(client, cfg);
    info!(
        sources = aggregator.sources().len(),
        per_source_limit = aggregator.per_source_limit(),
        client = aggregator.client_name(),
        ttl_secs = cfg.cache.ttl_secs,
        "tips service configured"
    );
    let cache = Arc::new(CacheManager::new(aggregator, cfg.ttl()));
    Ok(AppState::new(cache).with_source_ready(ready))
}
