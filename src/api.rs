use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::cache::CacheManager;
use crate::classify::Category;
use crate::model::ContentItem;
use crate::query::{CategoryCounts, QueryError, TipsQuery};

const DEFAULT_LIST_LIMIT: usize = 20;
const DEFAULT_SEARCH_LIMIT: usize = 10;

#[derive(Clone)]
pub struct AppState {
    query: TipsQuery,
    /// False when the upstream client could not be set up (e.g. missing credentials).
    source_ready: bool,
}

impl AppState {
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self {
            query: TipsQuery::new(cache),
            source_ready: true,
        }
    }

    pub fn with_source_ready(mut self, ready: bool) -> Self {
        self.source_ready = ready;
        self
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        self.query.cache()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/recent-tips", get(recent_tips))
        .route("/random-tip", get(random_tip))
        .route("/search-tips", get(search_tips))
        .route("/categories", get(categories))
        .route("/refresh-cache", post(refresh_cache))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Query-layer errors mapped onto HTTP.
pub struct ApiError(QueryError);

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        Self(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            QueryError::NotFound(_) => StatusCode::NOT_FOUND,
            QueryError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        };
        (
            status,
            Json(ErrorBody {
                detail: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

fn parse_category(raw: Option<&str>) -> Result<Option<Category>, QueryError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s.parse::<Category>().map(Some).map_err(QueryError::InvalidArgument),
    }
}

#[derive(Serialize)]
struct HealthOut {
    status: &'static str,
    sources: usize,
    cached_tips: usize,
    refreshing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_refreshed_at: Option<DateTime<Utc>>,
}

async fn health(State(state): State<AppState>) -> Response {
    if !state.source_ready {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody {
                detail: "Reddit API not initialized".to_string(),
            }),
        )
            .into_response();
    }
    let cache = state.cache();
    let status = cache.status();
    Json(HealthOut {
        status: "healthy",
        sources: cache.aggregator().sources().len(),
        cached_tips: status.items,
        refreshing: status.refreshing,
        last_refreshed_at: status.last_refreshed_at,
    })
    .into_response()
}

#[derive(Deserialize)]
struct ListParams {
    category: Option<String>,
    limit: Option<usize>,
}

async fn recent_tips(
    State(state): State<AppState>,
    Query(q): Query<ListParams>,
) -> Result<Json<Vec<ContentItem>>, ApiError> {
    let category = parse_category(q.category.as_deref())?;
    let tips = state
        .query
        .list_tips(category, q.limit.unwrap_or(DEFAULT_LIST_LIMIT))
        .await?;
    Ok(Json(tips))
}

#[derive(Deserialize)]
struct RandomParams {
    category: Option<String>,
}

async fn random_tip(
    State(state): State<AppState>,
    Query(q): Query<RandomParams>,
) -> Result<Json<ContentItem>, ApiError> {
    let category = parse_category(q.category.as_deref())?;
    Ok(Json(state.query.random_tip(category).await?))
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    query: String,
    limit: Option<usize>,
}

async fn search_tips(
    State(state): State<AppState>,
    Query(q): Query<SearchParams>,
) -> Result<Json<Vec<ContentItem>>, ApiError> {
    let tips = state
        .query
        .search_tips(&q.query, q.limit.unwrap_or(DEFAULT_SEARCH_LIMIT))
        .await?;
    Ok(Json(tips))
}

async fn categories(State(state): State<AppState>) -> Json<CategoryCounts> {
    Json(state.query.category_counts().await)
}

#[derive(Serialize)]
struct RefreshOut {
    success: bool,
    tips_count: usize,
    timestamp: Option<String>,
}

async fn refresh_cache(State(state): State<AppState>) -> Json<RefreshOut> {
    let snap = state.cache().force_refresh().await;
    Json(RefreshOut {
        success: true,
        tips_count: snap.len(),
        timestamp: snap
            .last_refreshed_at
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_param_parsing() {
        assert_eq!(parse_category(None).unwrap(), None);
        assert_eq!(parse_category(Some("  ")).unwrap(), None);
        assert_eq!(parse_category(Some("Feeding")).unwrap(), Some(Category::Feeding));
        assert!(matches!(
            parse_category(Some("toddlers")),
            Err(QueryError::InvalidArgument(_))
        ));
    }
}
