// src/model.rs
//! Content items and the immutable snapshot the cache hands out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::Category;

/// One tip as served to consumers. Built once during aggregation, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentItem {
    pub title: String,
    pub source: String,
    pub url: String,
    pub score: u64,
    pub comment_count: u64,
    pub created_at: i64, // unix seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_excerpt: Option<String>,
    pub category: Category,
}

impl ContentItem {
    /// Case-insensitive substring match on title or body excerpt.
    /// `needle` must already be lower-cased.
    pub fn matches_lowered(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self
                .body_excerpt
                .as_deref()
                .is_some_and(|b| b.to_lowercase().contains(needle))
    }
}

/// Result of one aggregation pass. Replaced wholesale on refresh.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheSnapshot {
    /// Sorted by score descending; ties keep merge order.
    pub items: Vec<ContentItem>,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    /// Bumped by the cache on every replacement; 0 = never refreshed.
    #[serde(skip)]
    pub(crate) generation: u64,
}

impl CacheSnapshot {
    pub fn new(items: Vec<ContentItem>, refreshed_at: DateTime<Utc>) -> Self {
        Self {
            items,
            last_refreshed_at: Some(refreshed_at),
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Stale when never refreshed or older than `ttl` at `now`.
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: std::time::Duration) -> bool {
        match self.last_refreshed_at {
            None => true,
            // a refresh stamped in the future (clock skew) counts as fresh
            Some(at) => now
                .signed_duration_since(at)
                .to_std()
                .is_ok_and(|age| age > ttl),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn item(title: &str, body: Option<&str>) -> ContentItem {
        ContentItem {
            title: title.to_string(),
            source: "Parenting".to_string(),
            url: "https://reddit.com/r/Parenting/x".to_string(),
            score: 12,
            comment_count: 4,
            created_at: 1_700_000_000,
            body_excerpt: body.map(str::to_string),
            category: Category::General,
        }
    }

    #[test]
    fn absent_excerpt_is_omitted_from_json() {
        let v = serde_json::to_value(item("Hello", None)).unwrap();
        assert!(v.get("body_excerpt").is_none());
        assert_eq!(v["category"], "general");

        let v = serde_json::to_value(item("Hello", Some("body"))).unwrap();
        assert_eq!(v["body_excerpt"], "body");
    }

    #[test]
    fn search_matches_title_or_body_case_insensitively() {
        let it = item("Bottle vs Breast", Some("Night FEEDS"));
        assert!(it.matches_lowered("bottle"));
        assert!(it.matches_lowered("feeds"));
        assert!(!it.matches_lowered("crawl"));
    }

    #[test]
    fn staleness_follows_ttl() {
        let empty = CacheSnapshot::default();
        assert!(empty.is_stale(Utc::now(), Duration::from_secs(3600)));

        let at = Utc::now();
        let snap = CacheSnapshot::new(vec![], at);
        assert!(!snap.is_stale(at + chrono::Duration::seconds(10), Duration::from_secs(60)));
        assert!(snap.is_stale(at + chrono::Duration::seconds(61), Duration::from_secs(60)));
    }
}
