// src/ingest/providers/reddit.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::ingest::types::{RawItem, SourceClient, SourceError, TimeWindow};

pub const ENV_REDDIT_CLIENT_ID: &str = "REDDIT_CLIENT_ID";
pub const ENV_REDDIT_CLIENT_SECRET: &str = "REDDIT_CLIENT_SECRET";
pub const ENV_REDDIT_USER_AGENT: &str = "REDDIT_USER_AGENT";
pub const DEFAULT_USER_AGENT: &str = "ParentingTips/1.0";

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";
// refresh the token a bit before Reddit expires it
const TOKEN_SLACK: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl RedditCredentials {
    /// Read credentials from `REDDIT_CLIENT_ID` / `REDDIT_CLIENT_SECRET` / `REDDIT_USER_AGENT`.
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var(ENV_REDDIT_CLIENT_ID).unwrap_or_default();
        let client_secret = std::env::var(ENV_REDDIT_CLIENT_SECRET).unwrap_or_default();
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return Err(anyhow!(
                "Missing {ENV_REDDIT_CLIENT_ID} or {ENV_REDDIT_CLIENT_SECRET}"
            ));
        }
        let user_agent = std::env::var(ENV_REDDIT_USER_AGENT)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        Ok(Self {
            client_id,
            client_secret,
            user_agent,
        })
    }
}

#[derive(Debug)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Read-only Reddit client using application-only OAuth.
pub struct RedditClient {
    http: reqwest::Client,
    creds: RedditCredentials,
    token: Mutex<Option<AccessToken>>,
}

impl RedditClient {
    pub fn new(creds: RedditCredentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(creds.user_agent.clone())
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .context("building reqwest client")?;
        tracing::info!(user_agent = %creds.user_agent, "Reddit API client initialized (read-only)");
        Ok(Self {
            http,
            creds,
            token: Mutex::new(None),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(RedditCredentials::from_env()?)
    }

    async fn bearer(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(tok) = guard.as_ref() {
            if Instant::now() < tok.expires_at {
                return Ok(tok.value.clone());
            }
        }

        #[derive(Deserialize)]
        struct TokenResp {
            access_token: String,
            #[serde(default)]
            expires_in: u64,
        }

        let resp = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.creds.client_id, Some(&self.creds.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("requesting reddit token")?
            .error_for_status()
            .context("reddit token endpoint")?;
        let body: TokenResp = resp.json().await.context("decoding reddit token")?;

        let ttl = Duration::from_secs(body.expires_in.max(60)).saturating_sub(TOKEN_SLACK);
        *guard = Some(AccessToken {
            value: body.access_token.clone(),
            expires_at: Instant::now() + ttl,
        });
        Ok(body.access_token)
    }

    async fn fetch_listing(&self, source: &str, window: TimeWindow, limit: usize) -> Result<String> {
        let token = self.bearer().await?;
        let url = format!("{API_BASE}/r/{source}/top");
        let limit = limit.to_string();
        let resp = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[("t", window.as_str()), ("limit", limit.as_str()), ("raw_json", "1")])
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            // force a new token on the next call
            self.token.lock().await.take();
        }
        if !status.is_success() {
            return Err(anyhow!("HTTP {status} from {url}"));
        }
        resp.text().await.context("reading listing body")
    }
}

#[async_trait]
impl SourceClient for RedditClient {
    async fn fetch_top(
        &self,
        source: &str,
        window: TimeWindow,
        limit: usize,
    ) -> std::result::Result<Vec<RawItem>, SourceError> {
        tracing::info!(target: "tips", "Fetching from r/{source}");
        let body = self
            .fetch_listing(source, window, limit)
            .await
            .map_err(|e| SourceError::unavailable(source, format!("{e:#}")))?;
        parse_listing(&body).map_err(|e| SourceError::unavailable(source, format!("{e:#}")))
    }

    fn name(&self) -> &'static str {
        "reddit"
    }
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    title: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
    permalink: String,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    selftext: Option<String>,
}

/// Parse a Reddit listing (`/r/{sub}/top` JSON) into raw items.
pub fn parse_listing(body: &str) -> Result<Vec<RawItem>> {
    let listing: Listing = serde_json::from_str(body).context("parsing reddit listing json")?;
    Ok(listing
        .data
        .children
        .into_iter()
        .map(|c| {
            let p = c.data;
            RawItem {
                title: html_escape::decode_html_entities(&p.title).to_string(),
                score: p.score,
                comment_count: p.num_comments,
                permalink: p.permalink,
                created_at: p.created_utc as i64,
                body: p
                    .selftext
                    .filter(|s| !s.is_empty())
                    .map(|s| html_escape::decode_html_entities(&s).to_string()),
            }
        })
        .collect())
}
