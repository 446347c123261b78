//! Job-board adapter backed by the JSearch API on RapidAPI.

use crate::config::ProvidersConfig;
use crate::error::ProviderError;
use crate::models::Organization;
use crate::providers::http::get_json;
use crate::providers::{ProviderAdapter, ProviderRecord, ResponseCache};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
struct JobSearchResponse {
    #[serde(default)]
    data: Vec<JobPosting>,
}

#[derive(Debug, Deserialize)]
struct JobPosting {
    job_title: String,
    job_apply_link: String,
}

/// Open job postings for an organization.
pub struct JobBoard {
    api_key: Option<String>,
    host: String,
    endpoint: String,
    limit: usize,
    cache: Option<Arc<ResponseCache>>,
}

impl JobBoard {
    pub fn from_config(config: &ProvidersConfig, cache: Option<Arc<ResponseCache>>) -> Self {
        Self {
            api_key: config.rapidapi_key.clone(),
            host: config.jsearch_host.clone(),
            endpoint: format!("https://{}/search", config.jsearch_host),
            limit: config.jobs_limit,
            cache,
        }
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        match self.api_key.as_deref() {
            Some(k) if !k.trim().is_empty() => Ok(k),
            _ => Err(ProviderError::NotConfigured("JSearch job board")),
        }
    }
}

/// Job boards index by company name, not domain.
fn search_term<'a>(organization: &'a Organization, query: &'a str) -> &'a str {
    if query == organization.as_str() {
        organization.company_name()
    } else {
        query
    }
}

#[async_trait]
impl ProviderAdapter for JobBoard {
    fn name(&self) -> &'static str {
        "jsearch"
    }

    async fn prepare(&self) -> Result<(), ProviderError> {
        self.api_key().map(|_| ())
    }

    async fn fetch(
        &self,
        client: &reqwest::Client,
        organization: &Organization,
        query: &str,
    ) -> Result<ProviderRecord, ProviderError> {
        let key = self.api_key()?;
        let term = search_term(organization, query);
        debug!(term, "JSearch job search");

        let params = [("query", term.to_string()), ("num_pages", "1".to_string())];
        let response: JobSearchResponse = get_json(
            client,
            self.cache.as_deref(),
            &self.endpoint,
            &params,
            &[("X-RapidAPI-Key", key), ("X-RapidAPI-Host", self.host.as_str())],
        )
        .await?;

        Ok(job_record(response, self.limit))
    }
}

fn job_record(response: JobSearchResponse, limit: usize) -> ProviderRecord {
    let postings: Vec<JobPosting> = response.data.into_iter().take(limit).collect();

    ProviderRecord {
        text: postings
            .iter()
            .map(|p| p.job_title.as_str())
            .collect::<Vec<_>>()
            .join("; "),
        evidence: postings.into_iter().map(|p| p.job_apply_link).collect(),
    }
}
