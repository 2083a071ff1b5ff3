use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::catalog::{CatalogApi, CatalogError, SearchPage, DETAILS_UNAVAILABLE, SEARCH_UNAVAILABLE};
use crate::config::Config;
use crate::models::{MovieDetail, MovieSummary, TypeFilter};

#[derive(Debug, Clone)]
pub struct OmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

/// OMDb answers every lookup with HTTP 200 and signals misses through
/// `Response: "False"` plus an `Error` string.
#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Error")]
    error: Option<String>,
    #[serde(rename = "Search", default)]
    search: Option<Vec<MovieSummary>>,
    #[serde(rename = "totalResults")]
    total_results: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Error")]
    error: Option<String>,
}

impl OmdbClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let user_agent = format!("cinesearch/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .context("Failed to build OMDb HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.omdb_base_url, &config.omdb_api_key)
    }

    fn search_url(&self, term: &str, filter: TypeFilter, page: u32) -> String {
        let mut url = format!(
            "{}/?apikey={}&s={}&page={}",
            self.base_url,
            self.api_key,
            urlencoding::encode(term),
            page
        );
        if let Some(kind) = filter.as_query() {
            url.push_str("&type=");
            url.push_str(kind);
        }
        url
    }

    fn details_url(&self, imdb_id: &str) -> String {
        format!(
            "{}/?apikey={}&i={}&plot=full",
            self.base_url,
            self.api_key,
            urlencoding::encode(imdb_id)
        )
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .context("request failed")?;
        let status = res.status();
        let text = res.text().await.context("reading body failed")?;
        if !status.is_success() {
            return Err(anyhow!("OMDb HTTP error (status {}): {}", status, text));
        }
        Ok(text)
    }
}

#[async_trait]
impl CatalogApi for OmdbClient {
    async fn search(
        &self,
        term: &str,
        filter: TypeFilter,
        page: u32,
    ) -> Result<SearchPage, CatalogError> {
        debug!(term = %term, filter = ?filter, page, "OMDb search");
        let url = self.search_url(term, filter, page);
        let body = self.get_text(&url).await.map_err(|e| {
            warn!("OMDb search for '{}' failed: {:#}", term, e);
            CatalogError::Unavailable(SEARCH_UNAVAILABLE)
        })?;
        let parsed = parse_search(&body);
        if let Err(CatalogError::Unavailable(_)) = &parsed {
            warn!("OMDb search for '{}' returned an unreadable body", term);
        }
        parsed
    }

    async fn get_details(&self, imdb_id: &str) -> Result<MovieDetail, CatalogError> {
        debug!(imdb_id = %imdb_id, "OMDb detail lookup");
        let url = self.details_url(imdb_id);
        let body = self.get_text(&url).await.map_err(|e| {
            warn!("OMDb detail lookup for '{}' failed: {:#}", imdb_id, e);
            CatalogError::Unavailable(DETAILS_UNAVAILABLE)
        })?;
        let parsed = parse_details(&body);
        if let Err(CatalogError::Unavailable(_)) = &parsed {
            warn!("OMDb detail lookup for '{}' returned an unreadable body", imdb_id);
        }
        parsed
    }
}

fn parse_search(body: &str) -> Result<SearchPage, CatalogError> {
    let envelope: SearchEnvelope = serde_json::from_str(body)
        .map_err(|_| CatalogError::Unavailable(SEARCH_UNAVAILABLE))?;
    if envelope.response.eq_ignore_ascii_case("False") {
        return Err(upstream(envelope.error, SEARCH_UNAVAILABLE));
    }
    let total_results = envelope
        .total_results
        .as_deref()
        .and_then(|t| t.trim().parse::<u64>().ok())
        .unwrap_or(0);
    Ok(SearchPage {
        results: envelope.search.unwrap_or_default(),
        total_results,
    })
}

fn parse_details(body: &str) -> Result<MovieDetail, CatalogError> {
    let status: StatusEnvelope = serde_json::from_str(body)
        .map_err(|_| CatalogError::Unavailable(DETAILS_UNAVAILABLE))?;
    if status.response.eq_ignore_ascii_case("False") {
        return Err(upstream(status.error, DETAILS_UNAVAILABLE));
    }
    serde_json::from_str(body).map_err(|_| CatalogError::Unavailable(DETAILS_UNAVAILABLE))
}

fn upstream(error: Option<String>, fallback: &'static str) -> CatalogError {
    match error {
        Some(msg) if !msg.trim().is_empty() => CatalogError::Upstream(msg),
        _ => CatalogError::Unavailable(fallback),
    }
}
