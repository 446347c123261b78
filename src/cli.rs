//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::SearchDepth;
use clap::Parser;
use std::path::PathBuf;

/// SignalScout - research signals about organizations from the open web
///
/// Turns a research goal into search queries, fans them out to web search,
/// news and job boards, merges near-duplicate findings and scores them.
///
/// Examples:
///   signalscout --goal "AI fraud detection" --org acme.com,globex.io
///   signalscout --request request.json --format markdown -o report.md
///   signalscout --goal "layoffs" --org acme.com --depth quick --dry-run
///   signalscout --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// JSON request file
    ///
    /// Holds research_goal, organizations, search_depth,
    /// max_parallel_searches and confidence_threshold. Flags given on the
    /// command line override the file.
    #[arg(short, long, value_name = "FILE", conflicts_with_all = ["goal", "orgs"])]
    pub request: Option<PathBuf>,

    /// Research goal in plain language
    #[arg(
        short,
        long,
        value_name = "TEXT",
        required_unless_present_any = ["request", "init_config"]
    )]
    pub goal: Option<String>,

    /// Organizations to research (comma-separated domains)
    ///
    /// Example: --org acme.com,globex.io
    #[arg(
        long = "org",
        value_name = "DOMAINS",
        value_delimiter = ',',
        required_unless_present_any = ["request", "init_config"]
    )]
    pub orgs: Vec<String>,

    /// How many queries to generate per source family
    #[arg(long, value_name = "DEPTH")]
    pub depth: Option<SearchDepth>,

    /// Maximum number of provider calls in flight
    #[arg(long, value_name = "NUM")]
    pub max_parallel: Option<usize>,

    /// Minimum confidence (0.0 - 1.0) for a finding to be reported
    #[arg(long, value_name = "SCORE")]
    pub threshold: Option<f64>,

    /// Output file path for the report
    ///
    /// Default: from config or research_report.json
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (json, markdown)
    #[arg(long, default_value = "json", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .signalscout.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Ollama model used for query generation
    #[arg(short, long, env = "SIGNALSCOUT_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Bing Web Search subscription key
    #[arg(long, env = "BING_API_KEY", hide_env_values = true)]
    pub bing_api_key: Option<String>,

    /// Bing News subscription key (defaults to the web search key)
    #[arg(long, env = "BING_NEWS_API_KEY", hide_env_values = true)]
    pub bing_news_api_key: Option<String>,

    /// RapidAPI key for the job board
    #[arg(long, env = "RAPIDAPI_KEY", hide_env_values = true)]
    pub rapidapi_key: Option<String>,

    /// Run deadline in seconds
    ///
    /// Provider calls still running at the deadline are recorded as failed.
    /// Default: from config or 120s.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Bypass the raw response cache
    #[arg(long)]
    pub no_cache: bool,

    /// Exit with code 2 when no finding meets the threshold
    #[arg(long)]
    pub fail_on_empty: bool,

    /// Dry run: generate and print queries without calling any provider
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .signalscout.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON response document (default)
    #[default]
    Json,
    /// Markdown research report
    Markdown,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.ollama_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(threshold) = self.threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err("Threshold must be between 0.0 and 1.0".to_string());
            }
        }

        if self.max_parallel == Some(0) {
            return Err("Max parallel searches must be at least 1".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if let Some(ref path) = self.request {
            if !path.is_file() {
                return Err(format!("Request file does not exist: {}", path.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
