// src/ingest/mod.rs
pub mod providers;
pub mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use once_cell::sync::OnceCell;

use crate::classify::Classifier;
use crate::config::TipsConfig;
use crate::ingest::types::{RawItem, SourceClient, SourceError, TimeWindow};
use crate::model::{CacheSnapshot, ContentItem};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "tips_items_fetched_total",
            "Raw items returned by sources."
        );
        describe_counter!(
            "tips_items_kept_total",
            "Items kept after the quality filter."
        );
        describe_counter!(
            "tips_items_filtered_total",
            "Items dropped by the quality filter."
        );
        describe_counter!(
            "tips_source_errors_total",
            "Per-source fetch failures (including timeouts)."
        );
        describe_counter!("tips_refresh_total", "Aggregation passes executed.");
        describe_counter!(
            "tips_refresh_coalesced_total",
            "Refresh requests served by an in-flight refresh."
        );
        describe_histogram!("tips_refresh_ms", "Aggregation pass duration in milliseconds.");
        describe_gauge!("tips_cache_items", "Items in the current snapshot.");
        describe_gauge!(
            "tips_cache_last_refresh_ts",
            "Unix ts of the last snapshot replacement."
        );
    });
}

/// Minimum score/comment thresholds an item must meet to be kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityFilter {
    pub min_score: i64,
    pub min_comments: i64,
}

impl Default for QualityFilter {
    fn default() -> Self {
        Self {
            min_score: 10,
            min_comments: 3,
        }
    }
}

impl QualityFilter {
    pub fn passes(&self, raw: &RawItem) -> bool {
        raw.score >= self.min_score && raw.comment_count >= self.min_comments
    }
}

/// Outcome of one source within a refresh pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub source: String,
    pub fetched: usize,
    pub kept: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    pub sources: Vec<SourceReport>,
}

impl RefreshReport {
    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.error.is_some()).count()
    }

    pub fn kept(&self) -> usize {
        self.sources.iter().map(|s| s.kept).sum()
    }
}

/// Fans out to every configured source, filters, classifies and ranks.
pub struct Aggregator {
    client: Arc<dyn SourceClient>,
    sources: Vec<String>,
    classifier: Classifier,
    filter: QualityFilter,
    window: TimeWindow,
    total_limit: usize,
    excerpt_max_chars: usize,
    link_base: String,
    fetch_timeout: Duration,
}

impl Aggregator {
    pub fn new(client: Arc<dyn SourceClient>, cfg: &TipsConfig) -> Self {
        Self {
            client,
            sources: cfg.sources.names.clone(),
            classifier: cfg.classifier(),
            filter: QualityFilter {
                min_score: cfg.aggregate.min_score,
                min_comments: cfg.aggregate.min_comments,
            },
            window: cfg.aggregate.time_window,
            total_limit: cfg.aggregate.total_limit,
            excerpt_max_chars: cfg.aggregate.excerpt_max_chars,
            link_base: cfg.aggregate.link_base.clone(),
            fetch_timeout: cfg.fetch_timeout(),
        }
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn client_name(&self) -> &'static str {
        self.client.name()
    }

    /// Items requested from each source.
    pub fn per_source_limit(&self) -> usize {
        if self.sources.is_empty() {
            return 0;
        }
        (self.total_limit / self.sources.len()).max(1)
    }

    /// Run one aggregation pass. Never fails: unavailable sources contribute nothing.
    pub async fn refresh(&self) -> CacheSnapshot {
        self.refresh_with_report().await.0
    }

    pub async fn refresh_with_report(&self) -> (CacheSnapshot, RefreshReport) {
        ensure_metrics_described();
        let t0 = Instant::now();
        let limit = self.per_source_limit();

        let fetches = self
            .sources
            .iter()
            .map(|source| self.fetch_one(source, limit));
        // join_all keeps configured order, which is the stable-sort tie-break
        let results = futures::future::join_all(fetches).await;

        let mut items = Vec::new();
        let mut report = RefreshReport::default();
        for (source, result) in self.sources.iter().zip(results) {
            let raw = match result {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(target: "tips", source = %source, error = %e, "source unavailable");
                    counter!("tips_source_errors_total").increment(1);
                    report.sources.push(SourceReport {
                        source: source.clone(),
                        fetched: 0,
                        kept: 0,
                        error: Some(e.to_string()),
                    });
                    continue;
                }
            };

            let fetched = raw.len();
            let before = items.len();
            items.extend(raw.into_iter().filter_map(|r| self.ingest_item(source, r)));
            let kept = items.len() - before;

            counter!("tips_items_fetched_total").increment(fetched as u64);
            counter!("tips_items_kept_total").increment(kept as u64);
            counter!("tips_items_filtered_total").increment((fetched - kept) as u64);
            tracing::debug!(target: "tips", source = %source, fetched, kept, "source fetched");
            report.sources.push(SourceReport {
                source: source.clone(),
                fetched,
                kept,
                error: None,
            });
        }

        // Vec::sort_by is stable
        items.sort_by(|a, b| b.score.cmp(&a.score));

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("tips_refresh_ms").record(ms);
        counter!("tips_refresh_total").increment(1);
        tracing::info!(
            target: "tips",
            items = items.len(),
            sources = self.sources.len(),
            failed = report.failed_sources(),
            elapsed_ms = ms as u64,
            "aggregation finished"
        );

        (CacheSnapshot::new(items, Utc::now()), report)
    }

    async fn fetch_one(&self, source: &str, limit: usize) -> Result<Vec<RawItem>, SourceError> {
        match tokio::time::timeout(
            self.fetch_timeout,
            self.client.fetch_top(source, self.window, limit),
        )
        .await
        {
            Ok(res) => res,
            Err(_) => Err(SourceError::unavailable(
                source,
                format!("timed out after {}s", self.fetch_timeout.as_secs_f32()),
            )),
        }
    }

    /// Filter, classify and shape one raw item; `None` when it is dropped.
    fn ingest_item(&self, source: &str, raw: RawItem) -> Option<ContentItem> {
        if !self.filter.passes(&raw) {
            return None;
        }
        let title = raw.title.trim();
        if title.is_empty() {
            return None;
        }

        let body = raw.body.as_deref().filter(|b| !b.trim().is_empty());
        let category = self
            .classifier
            .classify(source, title, body.unwrap_or_default());

        Some(ContentItem {
            title: title.to_string(),
            source: source.to_string(),
            url: canonical_url(&self.link_base, &raw.permalink),
            score: raw.score.max(0) as u64,
            comment_count: raw.comment_count.max(0) as u64,
            created_at: raw.created_at,
            body_excerpt: body.map(|b| truncate_chars(b, self.excerpt_max_chars)),
            category,
        })
    }
}

/// Absolute permalinks pass through; relative ones are joined onto `base`.
pub fn canonical_url(base: &str, permalink: &str) -> String {
    let p = permalink.trim();
    if p.starts_with("http://") || p.starts_with("https://") {
        return p.to_string();
    }
    let base = base.trim_end_matches('/');
    if p.starts_with('/') {
        format!("{base}{p}")
    } else {
        format!("{base}/{p}")
    }
}

/// Cap at `max` Unicode scalar values.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
