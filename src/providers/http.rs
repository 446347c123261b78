//! Shared GET-and-decode helper for the provider adapters.

use crate::error::ProviderError;
use crate::providers::cache::ResponseCache;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

/// GET `endpoint` with query `params` and `headers`, decoding a JSON body.
///
/// When a cache is given, a fresh cached body short-circuits the request
/// and successful bodies are written back.
pub async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    cache: Option<&ResponseCache>,
    endpoint: &str,
    params: &[(&str, String)],
    headers: &[(&str, &str)],
) -> Result<T, ProviderError> {
    let url = Url::parse_with_params(endpoint, params)
        .map_err(|e| ProviderError::Request(format!("invalid endpoint {}: {}", endpoint, e)))?;

    if let Some(cache) = cache {
        if let Some(body) = cache.get(url.as_str()).await {
            match serde_json::from_str(&body) {
                Ok(parsed) => return Ok(parsed),
                Err(e) => debug!(url = %url, error = %e, "Ignoring unreadable cache entry"),
            }
        }
    }

    let mut request = client.get(url.clone());
    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    let response = request.send().await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Status { status, body });
    }

    let body = response.text().await?;
    let parsed =
        serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

    if let Some(cache) = cache {
        cache.put(url.as_str(), &body).await;
    }

    Ok(parsed)
}
