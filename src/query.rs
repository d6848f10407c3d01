// src/query.rs
//! Read-side operations over whatever snapshot the cache currently serves.
//! Argument validation happens before the cache is touched.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::seq::IndexedRandom;
use serde::Serialize;

use crate::cache::CacheManager;
use crate::classify::Category;
use crate::model::{CacheSnapshot, ContentItem};

pub const MIN_QUERY_LEN: usize = 3;
pub const MAX_LIST_LIMIT: usize = 100;
pub const MAX_SEARCH_LIMIT: usize = 50;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidArgument(String),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryCounts {
    pub categories: BTreeMap<Category, usize>,
    #[serde(rename = "total_tips")]
    pub total: usize,
}

fn check_limit(limit: usize, max: usize) -> Result<(), QueryError> {
    if limit == 0 || limit > max {
        return Err(QueryError::InvalidArgument(format!(
            "limit must be between 1 and {max}, got {limit}"
        )));
    }
    Ok(())
}

fn in_category(item: &ContentItem, category: Option<Category>) -> bool {
    category.map_or(true, |c| item.category == c)
}

/// Up to `limit` items, optionally of one category, in snapshot order.
pub fn list_tips(snap: &CacheSnapshot, category: Option<Category>, limit: usize) -> Vec<ContentItem> {
    snap.items
        .iter()
        .filter(|it| in_category(it, category))
        .take(limit)
        .cloned()
        .collect()
}

/// Uniform pick over the (optionally filtered) items.
pub fn random_tip(snap: &CacheSnapshot, category: Option<Category>) -> Result<ContentItem, QueryError> {
    if snap.is_empty() {
        return Err(QueryError::NotFound("No tips available".to_string()));
    }
    let pool: Vec<&ContentItem> = snap
        .items
        .iter()
        .filter(|it| in_category(it, category))
        .collect();
    match pool.choose(&mut rand::rng()) {
        Some(it) => Ok((*it).clone()),
        None => Err(QueryError::NotFound(format!(
            "No tips found for category: {}",
            category.map(|c| c.as_str()).unwrap_or("any")
        ))),
    }
}

/// Case-insensitive substring search over title and body excerpt.
pub fn search_tips(snap: &CacheSnapshot, query: &str, limit: usize) -> Vec<ContentItem> {
    let needle = query.trim().to_lowercase();
    snap.items
        .iter()
        .filter(|it| it.matches_lowered(&needle))
        .take(limit)
        .cloned()
        .collect()
}

pub fn category_counts(snap: &CacheSnapshot) -> CategoryCounts {
    let mut categories = BTreeMap::new();
    for it in &snap.items {
        *categories.entry(it.category).or_insert(0) += 1;
    }
    CategoryCounts {
        categories,
        total: snap.len(),
    }
}

pub fn validate_search_query(query: &str) -> Result<(), QueryError> {
    if query.trim().chars().count() < MIN_QUERY_LEN {
        return Err(QueryError::InvalidArgument(format!(
            "query must be at least {MIN_QUERY_LEN} characters"
        )));
    }
    Ok(())
}

/// Query facade handed to transport layers.
#[derive(Clone)]
pub struct TipsQuery {
    cache: Arc<CacheManager>,
}

impl TipsQuery {
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    pub async fn list_tips(
        &self,
        category: Option<Category>,
        limit: usize,
    ) -> Result<Vec<ContentItem>, QueryError> {
        check_limit(limit, MAX_LIST_LIMIT)?;
        let snap = self.cache.get_snapshot().await;
        Ok(list_tips(&snap, category, limit))
    }

    pub async fn random_tip(&self, category: Option<Category>) -> Result<ContentItem, QueryError> {
        let snap = self.cache.get_snapshot().await;
        random_tip(&snap, category)
    }

    pub async fn search_tips(&self, query: &str, limit: usize) -> Result<Vec<ContentItem>, QueryError> {
        validate_search_query(query)?;
        check_limit(limit, MAX_SEARCH_LIMIT)?;
        let snap = self.cache.get_snapshot().await;
        Ok(search_tips(&snap, query, limit))
    }

    pub async fn category_counts(&self) -> CategoryCounts {
        let snap = self.cache.get_snapshot().await;
        category_counts(&snap)
    }
}
