//! # Tips Cache
//! Owns the current [`CacheSnapshot`] and decides when to rebuild it.
//!
//! - Readers clone an `Arc` out of an `RwLock`, so they see either the old or
//!   the new snapshot, never a mix.
//! - Refreshes are serialized behind an async gate. Every snapshot carries a
//!   generation; a caller remembers the generation it saw before queueing and,
//!   once it holds the gate, reuses the current snapshot if the generation has
//!   moved on. N concurrent callers on a stale cache therefore cause exactly
//!   one aggregation pass and all receive the same `Arc`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::ingest::Aggregator;
use crate::model::CacheSnapshot;

pub const DEFAULT_TTL: Duration = Duration::from_secs(6 * 3600);

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheStatus {
    pub items: usize,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub ttl_secs: u64,
    pub refreshing: bool,
}

pub struct CacheManager {
    aggregator: Aggregator,
    ttl: Duration,
    current: RwLock<Arc<CacheSnapshot>>,
    refresh_gate: Mutex<()>,
    refreshing: AtomicBool,
}

impl CacheManager {
    pub fn new(aggregator: Aggregator, ttl: Duration) -> Self {
        Self {
            aggregator,
            ttl,
            current: RwLock::new(Arc::new(CacheSnapshot::default())),
            refresh_gate: Mutex::new(()),
            refreshing: AtomicBool::new(false),
        }
    }

    pub fn with_default_ttl(aggregator: Aggregator) -> Self {
        Self::new(aggregator, DEFAULT_TTL)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Current snapshot without any freshness check.
    pub fn current(&self) -> Arc<CacheSnapshot> {
        let guard = self.current.read().unwrap_or_else(|p| p.into_inner());
        Arc::clone(&guard)
    }

    /// Fresh snapshot: served from memory within the TTL, otherwise rebuilt
    /// (or joined, if a rebuild is already running) before returning.
    pub async fn get_snapshot(&self) -> Arc<CacheSnapshot> {
        let snap = self.current();
        if !snap.is_stale(Utc::now(), self.ttl) {
            tracing::debug!(target: "tips", items = snap.len(), "Using cached tips");
            return snap;
        }
        tracing::info!(target: "tips", "Cache is stale, refreshing...");
        self.refresh_after(snap.generation()).await
    }

    /// Rebuild regardless of staleness. Joins an in-flight rebuild instead of
    /// starting a second one.
    pub async fn force_refresh(&self) -> Arc<CacheSnapshot> {
        tracing::info!(target: "tips", "Manual cache refresh requested");
        let seen = self.current().generation();
        self.refresh_after(seen).await
    }

    pub fn status(&self) -> CacheStatus {
        let snap = self.current();
        CacheStatus {
            items: snap.len(),
            last_refreshed_at: snap.last_refreshed_at,
            ttl_secs: self.ttl.as_secs(),
            refreshing: self.refreshing.load(Ordering::Acquire),
        }
    }

    async fn refresh_after(&self, seen_generation: u64) -> Arc<CacheSnapshot> {
        let _gate = self.refresh_gate.lock().await;

        let snap = self.current();
        if snap.generation() != seen_generation {
            counter!("tips_refresh_coalesced_total").increment(1);
            tracing::debug!(target: "tips", generation = snap.generation(), "joined in-flight refresh");
            return snap;
        }

        let _flag = InFlight::set(&self.refreshing);
        let mut fresh = self.aggregator.refresh().await;
        fresh.generation = seen_generation + 1;
        let fresh = Arc::new(fresh);

        {
            let mut guard = self.current.write().unwrap_or_else(|p| p.into_inner());
            *guard = Arc::clone(&fresh);
        }

        gauge!("tips_cache_items").set(fresh.len() as f64);
        if let Some(at) = fresh.last_refreshed_at {
            gauge!("tips_cache_last_refresh_ts").set(at.timestamp() as f64);
        }
        tracing::info!(
            target: "tips",
            items = fresh.len(),
            generation = fresh.generation(),
            "Fetched {} tips",
            fresh.len()
        );
        fresh
    }
}

// Clears the in-flight flag even if the refreshing future is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
