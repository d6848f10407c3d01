// src/config/tips.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classify::Classifier;
use crate::ingest::types::TimeWindow;

pub const ENV_TIPS_CONFIG_PATH: &str = "TIPS_CONFIG_PATH";
pub const ENV_TIPS_CACHE_TTL_SECS: &str = "TIPS_CACHE_TTL_SECS";
pub const DEFAULT_TIPS_CONFIG_TOML: &str = "config/tips.toml";
pub const DEFAULT_TIPS_CONFIG_JSON: &str = "config/tips.json";

const DEFAULT_SOURCES: &[&str] = &[
    "NewParents",
    "Parenting",
    "beyondthebump",
    "ScienceBasedParenting",
    "sleeptrain",
    "daddit",
    "Mommit",
    "breastfeeding",
    "FormulaFeeders",
    "workingmoms",
];

fn default_names() -> Vec<String> {
    DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect()
}
fn default_sleep_topic() -> Vec<String> {
    vec!["sleeptrain".to_string()]
}
fn default_feeding_topic() -> Vec<String> {
    vec!["breastfeeding".to_string(), "FormulaFeeders".to_string()]
}
fn default_total_limit() -> usize {
    50
}
fn default_min_score() -> i64 {
    10
}
fn default_min_comments() -> i64 {
    3
}
fn default_excerpt_max_chars() -> usize {
    500
}
fn default_link_base() -> String {
    "https://reddit.com".to_string()
}
fn default_fetch_timeout_secs() -> u64 {
    10
}
fn default_ttl_secs() -> u64 {
    6 * 3600
}

/// Full service configuration (`config/tips.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TipsConfig {
    #[serde(default)]
    pub sources: SourcesSection,
    #[serde(default)]
    pub aggregate: AggregateSection,
    #[serde(default)]
    pub cache: CacheSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesSection {
    /// Fetch order; also the merge order before sorting.
    #[serde(default = "default_names")]
    pub names: Vec<String>,
    #[serde(default = "default_sleep_topic")]
    pub sleep_topic: Vec<String>,
    #[serde(default = "default_feeding_topic")]
    pub feeding_topic: Vec<String>,
}

impl Default for SourcesSection {
    fn default() -> Self {
        Self {
            names: default_names(),
            sleep_topic: default_sleep_topic(),
            feeding_topic: default_feeding_topic(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateSection {
    #[serde(default = "default_total_limit")]
    pub total_limit: usize,
    #[serde(default)]
    pub time_window: TimeWindow,
    #[serde(default = "default_min_score")]
    pub min_score: i64,
    #[serde(default = "default_min_comments")]
    pub min_comments: i64,
    #[serde(default = "default_excerpt_max_chars")]
    pub excerpt_max_chars: usize,
    #[serde(default = "default_link_base")]
    pub link_base: String,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for AggregateSection {
    fn default() -> Self {
        Self {
            total_limit: default_total_limit(),
            time_window: TimeWindow::default(),
            min_score: default_min_score(),
            min_comments: default_min_comments(),
            excerpt_max_chars: default_excerpt_max_chars(),
            link_base: default_link_base(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl TipsConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.aggregate.fetch_timeout_secs)
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(
            self.sources.sleep_topic.as_slice(),
            self.sources.feeding_topic.as_slice(),
        )
    }

    /// Trim names, drop empties and duplicates (first occurrence wins).
    fn sanitize(mut self) -> Self {
        self.sources.names = clean_ordered(self.sources.names);
        self.sources.sleep_topic = clean_ordered(self.sources.sleep_topic);
        self.sources.feeding_topic = clean_ordered(self.sources.feeding_topic);
        if self.aggregate.fetch_timeout_secs == 0 {
            self.aggregate.fetch_timeout_secs = default_fetch_timeout_secs();
        }
        self
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_tips_config_from(path: &Path) -> Result<TipsConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading tips config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_tips_config(&content, ext.as_str())
        .with_context(|| format!("parsing tips config {}", path.display()))
}

/// Load config using env var + fallbacks:
/// 1) $TIPS_CONFIG_PATH
/// 2) config/tips.toml
/// 3) config/tips.json
/// 4) built-in defaults
///
/// `$TIPS_CACHE_TTL_SECS` overrides the TTL afterwards.
pub fn load_tips_config_default() -> Result<TipsConfig> {
    let cfg = if let Ok(p) = std::env::var(ENV_TIPS_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("TIPS_CONFIG_PATH points to non-existent path"));
        }
        load_tips_config_from(&pb)?
    } else if Path::new(DEFAULT_TIPS_CONFIG_TOML).exists() {
        load_tips_config_from(Path::new(DEFAULT_TIPS_CONFIG_TOML))?
    } else if Path::new(DEFAULT_TIPS_CONFIG_JSON).exists() {
        load_tips_config_from(Path::new(DEFAULT_TIPS_CONFIG_JSON))?
    } else {
        TipsConfig::default()
    };
    Ok(apply_env_overrides(cfg))
}

fn apply_env_overrides(mut cfg: TipsConfig) -> TipsConfig {
    if let Some(ttl) = parse_ttl_env(std::env::var(ENV_TIPS_CACHE_TTL_SECS).ok()) {
        cfg.cache.ttl_secs = ttl;
    }
    cfg
}

// positive integers only; anything else keeps the configured TTL
fn parse_ttl_env(raw: Option<String>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
}

fn parse_tips_config(s: &str, hint_ext: &str) -> Result<TipsConfig> {
    let cfg = match hint_ext {
        "json" => serde_json::from_str::<TipsConfig>(s)
            .map_err(anyhow::Error::from)
            .or_else(|_| toml::from_str::<TipsConfig>(s).map_err(anyhow::Error::from))?,
        _ => toml::from_str::<TipsConfig>(s)
            .map_err(anyhow::Error::from)
            .or_else(|_| serde_json::from_str::<TipsConfig>(s).map_err(anyhow::Error::from))?,
    };
    Ok(cfg.sanitize())
}

fn clean_ordered(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}
