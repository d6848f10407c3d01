// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use parenting_tips::config::TipsConfig;
use parenting_tips::ingest::types::{RawItem, SourceClient, SourceError, TimeWindow};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scriptable source: canned items per source, failing sources, artificial latency.
#[derive(Default)]
pub struct MockClient {
    items: HashMap<String, Vec<RawItem>>,
    failing: HashSet<String>,
    slow: HashMap<String, Duration>,
    delay: Duration,
    calls: AtomicUsize,
    limits: Mutex<Vec<(String, usize)>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(mut self, source: &str, items: Vec<RawItem>) -> Self {
        self.items.insert(source.to_string(), items);
        self
    }

    pub fn failing(mut self, source: &str) -> Self {
        self.failing.insert(source.to_string());
        self
    }

    /// Latency for every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Extra latency for one source only.
    pub fn slow(mut self, source: &str, delay: Duration) -> Self {
        self.slow.insert(source.to_string(), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn limits(&self) -> Vec<(String, usize)> {
        self.limits.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceClient for MockClient {
    async fn fetch_top(
        &self,
        source: &str,
        _window: TimeWindow,
        limit: usize,
    ) -> Result<Vec<RawItem>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.limits.lock().unwrap().push((source.to_string(), limit));

        let delay = self.delay + self.slow.get(source).copied().unwrap_or_default();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(source) {
            return Err(SourceError::unavailable(source, "HTTP 503 Service Unavailable"));
        }
        Ok(self.items.get(source).cloned().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

pub fn raw(title: &str, score: i64, comments: i64, body: Option<&str>) -> RawItem {
    RawItem {
        title: title.to_string(),
        score,
        comment_count: comments,
        permalink: format!("/r/test/comments/{}/", title.to_lowercase().replace(' ', "_")),
        created_at: 1_700_000_000,
        body: body.map(str::to_string),
    }
}

/// Config with the given sources; `sleep` lists the sleep-topic group, no feeding group.
pub fn config(sources: &[&str], sleep: &[&str]) -> TipsConfig {
    let mut cfg = TipsConfig::default();
    cfg.sources.names = sources.iter().map(|s| s.to_string()).collect();
    cfg.sources.sleep_topic = sleep.iter().map(|s| s.to_string()).collect();
    cfg.sources.feeding_topic = Vec::new();
    cfg
}

/// The two-source scenario: sourceA is a sleep source, sourceB is general.
pub fn two_source_client() -> MockClient {
    MockClient::new()
        .with_items(
            "sourceA",
            vec![raw("Sleep regression help", 15, 5, Some("baby won't nap"))],
        )
        .with_items(
            "sourceB",
            vec![
                raw("Bottle vs breast debate", 20, 10, None),
                raw("Low score post", 2, 1, None),
            ],
        )
}
