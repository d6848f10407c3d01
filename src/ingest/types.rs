// src/ingest/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One post as reported by a source, before filtering and classification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub score: i64,
    pub comment_count: i64,
    /// Source-relative permalink (e.g. `/r/sleeptrain/comments/abc/...`) or absolute URL.
    pub permalink: String,
    pub created_at: i64, // unix seconds
    #[serde(default)]
    pub body: Option<String>,
}

/// "Top of period" window passed through to the source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Hour,
    Day,
    #[default]
    Week,
    Month,
    Year,
    All,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Hour => "hour",
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
            TimeWindow::Year => "year",
            TimeWindow::All => "all",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" => Ok(TimeWindow::Hour),
            "day" => Ok(TimeWindow::Day),
            "week" => Ok(TimeWindow::Week),
            "month" => Ok(TimeWindow::Month),
            "year" => Ok(TimeWindow::Year),
            "all" => Ok(TimeWindow::All),
            other => Err(format!("unknown time window: {other}")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network, auth, rate-limit or payload failure for one source.
    #[error("source '{source_name}' unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },
}

impl SourceError {
    pub fn unavailable(source: &str, reason: impl fmt::Display) -> Self {
        SourceError::Unavailable {
            source_name: source.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Read-only access to ranked items of named sources.
///
/// Returns an empty list when a source simply has no results; errors are
/// reserved for the source being unreachable.
#[async_trait::async_trait]
pub trait SourceClient: Send + Sync {
    async fn fetch_top(
        &self,
        source: &str,
        window: TimeWindow,
        limit: usize,
    ) -> Result<Vec<RawItem>, SourceError>;
    fn name(&self) -> &'static str;
}
