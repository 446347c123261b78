//! Bing web search and news adapters.

use crate::config::ProvidersConfig;
use crate::error::ProviderError;
use crate::models::Organization;
use crate::providers::http::get_json;
use crate::providers::{ProviderAdapter, ProviderRecord, ResponseCache};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

const SUBSCRIPTION_HEADER: &str = "Ocp-Apim-Subscription-Key";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebSearchResponse {
    #[serde(default)]
    web_pages: Option<WebPages>,
}

#[derive(Debug, Default, Deserialize)]
struct WebPages {
    #[serde(default)]
    value: Vec<WebPage>,
}

#[derive(Debug, Deserialize)]
struct WebPage {
    #[serde(default)]
    name: String,
    url: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Default, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    value: Vec<NewsArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsArticle {
    name: String,
    url: String,
}

/// Bing Web Search API. One call per generated query.
pub struct BingWebSearch {
    api_key: Option<String>,
    endpoint: String,
    count: usize,
    cache: Option<Arc<ResponseCache>>,
}

impl BingWebSearch {
    pub fn from_config(config: &ProvidersConfig, cache: Option<Arc<ResponseCache>>) -> Self {
        Self {
            api_key: config.bing_api_key.clone(),
            endpoint: config.bing_search_endpoint.clone(),
            count: config.search_count,
            cache,
        }
    }
}

#[async_trait]
impl ProviderAdapter for BingWebSearch {
    fn name(&self) -> &'static str {
        "bing-web"
    }

    async fn prepare(&self) -> Result<(), ProviderError> {
        require_key(&self.api_key, "Bing web search").map(|_| ())
    }

    async fn fetch(
        &self,
        client: &reqwest::Client,
        _organization: &Organization,
        query: &str,
    ) -> Result<ProviderRecord, ProviderError> {
        let key = require_key(&self.api_key, "Bing web search")?;
        debug!(query, "Bing web search");

        let params = [
            ("q", query.to_string()),
            ("count", self.count.to_string()),
            ("responseFilter", "Webpages".to_string()),
        ];
        let response: WebSearchResponse = get_json(
            client,
            self.cache.as_deref(),
            &self.endpoint,
            &params,
            &[(SUBSCRIPTION_HEADER, key)],
        )
        .await?;

        Ok(web_record(response))
    }
}

/// Bing News Search API. One call per organization.
pub struct BingNews {
    api_key: Option<String>,
    endpoint: String,
    count: usize,
    market: String,
    cache: Option<Arc<ResponseCache>>,
}

impl BingNews {
    pub fn from_config(config: &ProvidersConfig, cache: Option<Arc<ResponseCache>>) -> Self {
        Self {
            // news falls back to the web search key
            api_key: config
                .bing_news_api_key
                .clone()
                .or_else(|| config.bing_api_key.clone()),
            endpoint: config.bing_news_endpoint.clone(),
            count: config.news_count,
            market: config.market.clone(),
            cache,
        }
    }
}

#[async_trait]
impl ProviderAdapter for BingNews {
    fn name(&self) -> &'static str {
        "bing-news"
    }

    async fn prepare(&self) -> Result<(), ProviderError> {
        require_key(&self.api_key, "Bing news search").map(|_| ())
    }

    async fn fetch(
        &self,
        client: &reqwest::Client,
        _organization: &Organization,
        query: &str,
    ) -> Result<ProviderRecord, ProviderError> {
        let key = require_key(&self.api_key, "Bing news search")?;
        debug!(query, "Bing news search");

        let params = [
            ("q", query.to_string()),
            ("count", self.count.to_string()),
            ("mkt", self.market.clone()),
        ];
        let response: NewsResponse = get_json(
            client,
            self.cache.as_deref(),
            &self.endpoint,
            &params,
            &[(SUBSCRIPTION_HEADER, key)],
        )
        .await?;

        Ok(news_record(response, self.count))
    }
}

fn require_key<'a>(
    key: &'a Option<String>,
    provider: &'static str,
) -> Result<&'a str, ProviderError> {
    match key.as_deref() {
        Some(k) if !k.trim().is_empty() => Ok(k),
        _ => Err(ProviderError::NotConfigured(provider)),
    }
}

fn web_record(response: WebSearchResponse) -> ProviderRecord {
    let pages = response.web_pages.map(|p| p.value).unwrap_or_default();

    let text = pages
        .iter()
        .map(|p| if p.snippet.is_empty() { p.name.as_str() } else { p.snippet.as_str() })
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    ProviderRecord {
        text,
        evidence: pages.into_iter().map(|p| p.url).collect(),
    }
}

fn news_record(response: NewsResponse, limit: usize) -> ProviderRecord {
    let articles: Vec<NewsArticle> = response.value.into_iter().take(limit).collect();

    ProviderRecord {
        text: articles
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join("; "),
        evidence: articles.into_iter().map(|a| a.url).collect(),
    }
}
