// src/ingest/providers/fixture.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

use crate::ingest::types::{RawItem, SourceClient, SourceError, TimeWindow};

pub const ENV_TIPS_SOURCE_FIXTURE: &str = "TIPS_SOURCE_FIXTURE";

/// Serves canned raw items per source from a JSON map `{ "source": [raw, ...] }`.
/// Used for local runs without Reddit credentials. Unknown sources yield nothing.
#[derive(Debug, Clone, Default)]
pub struct FixtureClient {
    items: HashMap<String, Vec<RawItem>>,
}

impl FixtureClient {
    pub fn new(items: HashMap<String, Vec<RawItem>>) -> Self {
        Self {
            items: items
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
        }
    }

    pub fn from_fixture(content: &str) -> Result<Self> {
        let items: HashMap<String, Vec<RawItem>> =
            serde_json::from_str(content).context("parsing source fixture json")?;
        Ok(Self::new(items))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading source fixture {}", path.display()))?;
        Self::from_fixture(&content)
    }
}

#[async_trait]
impl SourceClient for FixtureClient {
    async fn fetch_top(
        &self,
        source: &str,
        _window: TimeWindow,
        limit: usize,
    ) -> std::result::Result<Vec<RawItem>, SourceError> {
        Ok(self
            .items
            .get(&source.to_lowercase())
            .map(|v| v.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_items_up_to_limit_and_empty_for_unknown() {
        let json = r#"{
          "sleeptrain": [
            {"title": "a", "score": 20, "comment_count": 5, "permalink": "/r/sleeptrain/1", "created_at": 1},
            {"title": "b", "score": 15, "comment_count": 4, "permalink": "/r/sleeptrain/2", "created_at": 2, "body": "nap"}
          ]
        }"#;
        let c = FixtureClient::from_fixture(json).unwrap();
        let one = c.fetch_top("SleepTrain", TimeWindow::Week, 1).await.unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].title, "a");
        let none = c.fetch_top("daddit", TimeWindow::Week, 5).await.unwrap();
        assert!(none.is_empty());
    }
}
