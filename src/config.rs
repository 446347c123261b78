//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.signalscout.toml` files.

use crate::models::SourceFamily;
use crate::pipeline::PipelineSettings;
use crate::providers::HttpSettings;
use crate::query::GeneratorConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".signalscout.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Query generation model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Search, news and job provider settings.
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Pipeline tunables.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Raw response cache.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "research_report.json".to_string()
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_model_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            timeout_seconds: default_model_timeout(),
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_model_timeout() -> u64 {
    60
}

impl ModelConfig {
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            ollama_url: self.ollama_url.clone(),
            model_name: self.name.clone(),
            temperature: self.temperature,
            timeout_seconds: self.timeout_seconds,
        }
    }
}

/// External provider settings. Keys are usually supplied through the
/// environment rather than written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Bing Web Search subscription key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bing_api_key: Option<String>,

    /// Bing News key; falls back to `bing_api_key`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bing_news_api_key: Option<String>,

    #[serde(default = "default_bing_search_endpoint")]
    pub bing_search_endpoint: String,

    #[serde(default = "default_bing_news_endpoint")]
    pub bing_news_endpoint: String,

    /// Web results requested per query.
    #[serde(default = "default_search_count")]
    pub search_count: usize,

    /// Headlines kept per organization.
    #[serde(default = "default_news_count")]
    pub news_count: usize,

    #[serde(default = "default_market")]
    pub market: String,

    /// RapidAPI key for the JSearch job board.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rapidapi_key: Option<String>,

    #[serde(default = "default_jsearch_host")]
    pub jsearch_host: String,

    /// Job postings kept per organization.
    #[serde(default = "default_jobs_limit")]
    pub jobs_limit: usize,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            bing_api_key: None,
            bing_news_api_key: None,
            bing_search_endpoint: default_bing_search_endpoint(),
            bing_news_endpoint: default_bing_news_endpoint(),
            search_count: default_search_count(),
            news_count: default_news_count(),
            market: default_market(),
            rapidapi_key: None,
            jsearch_host: default_jsearch_host(),
            jobs_limit: default_jobs_limit(),
            request_timeout_seconds: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_bing_search_endpoint() -> String {
    "https://api.bing.microsoft.com/v7.0/search".to_string()
}

fn default_bing_news_endpoint() -> String {
    "https://api.bing.microsoft.com/v7.0/news/search".to_string()
}

fn default_search_count() -> usize {
    10
}

fn default_news_count() -> usize {
    3
}

fn default_market() -> String {
    "en-US".to_string()
}

fn default_jsearch_host() -> String {
    "jsearch.p.rapidapi.com".to_string()
}

fn default_jobs_limit() -> usize {
    3
}

fn default_request_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("signalscout/{}", env!("CARGO_PKG_VERSION"))
}

impl ProvidersConfig {
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.request_timeout_seconds),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Pipeline tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Source families queries are generated for.
    #[serde(default = "default_query_families")]
    pub query_families: Vec<SourceFamily>,

    /// Minimum text similarity for two findings to merge.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Run-level deadline in seconds. 0 disables it.
    #[serde(default = "default_run_timeout")]
    pub run_timeout_seconds: u64,

    /// Grace period past the deadline before a fetch group is aborted.
    #[serde(default = "default_group_grace")]
    pub group_grace_seconds: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            query_families: default_query_families(),
            similarity_threshold: default_similarity_threshold(),
            run_timeout_seconds: default_run_timeout(),
            group_grace_seconds: default_group_grace(),
        }
    }
}

fn default_query_families() -> Vec<SourceFamily> {
    vec![
        SourceFamily::News,
        SourceFamily::Jobs,
        SourceFamily::Blogs,
        SourceFamily::Articles,
    ]
}

fn default_similarity_threshold() -> f64 {
    crate::pipeline::DEFAULT_SIMILARITY_THRESHOLD
}

fn default_run_timeout() -> u64 {
    120
}

fn default_group_grace() -> u64 {
    5
}

/// Raw response cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache directory.
    #[serde(default = "default_cache_dir")]
    pub dir: String,

    /// Entry lifetime in hours.
    #[serde(default = "default_cache_ttl")]
    pub ttl_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_cache_dir(),
            ttl_hours: default_cache_ttl(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_dir() -> String {
    ".cache/responses".to_string()
}

fn default_cache_ttl() -> u64 {
    24
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours.saturating_mul(3600))
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, and only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }

        if let Some(ref key) = args.bing_api_key {
            self.providers.bing_api_key = Some(key.clone());
        }
        if let Some(ref key) = args.bing_news_api_key {
            self.providers.bing_news_api_key = Some(key.clone());
        }
        if let Some(ref key) = args.rapidapi_key {
            self.providers.rapidapi_key = Some(key.clone());
        }

        if let Some(timeout) = args.timeout {
            self.pipeline.run_timeout_seconds = timeout;
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        if args.no_cache {
            self.cache.enabled = false;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Pipeline settings derived from the `[pipeline]` and `[providers]` sections.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        let run_timeout = match self.pipeline.run_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        PipelineSettings {
            query_families: self.pipeline.query_families.clone(),
            similarity_threshold: self.pipeline.similarity_threshold,
            run_timeout,
            group_grace: Duration::from_secs(self.pipeline.group_grace_seconds),
            http: self.providers.http_settings(),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
