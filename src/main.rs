//! SignalScout - research signals about organizations
//!
//! A CLI tool that turns a research goal into search queries with a local
//! Ollama model, fans them out to web search, news and job-board providers,
//! merges near-duplicate findings and scores them by relative confidence.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (invalid request, config, output file, etc.)
//!   2 - No finding met the threshold and --fail-on-empty was set

mod cli;
mod config;
mod error;
mod models;
mod pipeline;
mod progress;
mod providers;
mod query;
mod report;

#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use models::{PipelineReport, ResearchRequest};
use pipeline::{Orchestrator, PipelineObserver, Providers, TracingObserver};
use progress::ProgressObserver;
use providers::{BingNews, BingWebSearch, JobBoard, ProviderAdapter, ProviderRoutes, ResponseCache};
use query::OllamaQueryGenerator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    if let Err(e) = init_logging(&args) {
        eprintln!("Warning: {:#}", e);
    }

    info!("SignalScout v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_research(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Research failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .signalscout.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   API keys are read from BING_API_KEY, BING_NEWS_API_KEY and RAPIDAPI_KEY.");
    Ok(())
}

/// Initialize logging. `RUST_LOG` wins over --verbose/--quiet when set.
fn init_logging(args: &Args) -> Result<()> {
    let builder = FmtSubscriber::builder()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let result = if std::env::var_os("RUST_LOG").is_some() {
        tracing::subscriber::set_global_default(
            builder.with_env_filter(EnvFilter::from_default_env()).finish(),
        )
    } else {
        tracing::subscriber::set_global_default(builder.with_max_level(args.log_level()).finish())
    };

    result.context("Failed to set tracing subscriber")
}

/// Run the complete research workflow. Returns the exit code.
async fn run_research(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let request = load_request(&args)?;
    request.validate().context("Invalid research request")?;

    let generator = OllamaQueryGenerator::new(config.model.generator_config())?;
    let cache = build_cache(&config);
    let mut orchestrator = Orchestrator::new(
        Arc::new(generator),
        build_providers(&config, cache.clone()),
        config.pipeline_settings(),
    );
    if let Some(cache) = cache {
        orchestrator = orchestrator.with_cache_stats(cache.stats());
    }

    if args.dry_run {
        return handle_dry_run(&orchestrator, &request).await;
    }

    println!("🔎 Researching: {}", request.research_goal);
    println!("   Organizations: {}", request.organizations.join(", "));
    println!("   Depth: {:?}", request.search_depth);
    println!("   Model: {}", config.model.name);
    warn_missing_keys(&config);

    let progress = (!args.quiet).then(|| Arc::new(ProgressObserver::new()));
    let observer: Arc<dyn PipelineObserver> = match progress {
        Some(ref p) => p.clone(),
        None => Arc::new(TracingObserver),
    };

    let report = orchestrator
        .with_observer(observer)
        .run(&request)
        .await
        .context("Invalid research request")?;

    if let Some(p) = progress {
        p.finish();
    }

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &request),
    };

    let output_path = output_path(&args, &config);
    report::write_output(&output, &output_path)?;

    print_summary(&report);
    println!(
        "\n✅ Research complete! Report saved to: {}",
        output_path.display()
    );

    if args.fail_on_empty && report.results.is_empty() {
        eprintln!("\n⛔ No finding met the confidence threshold. Failing (exit code 2).");
        return Ok(2);
    }

    Ok(0)
}

/// Handle --dry-run: generate queries, print them, exit.
async fn handle_dry_run(orchestrator: &Orchestrator, request: &ResearchRequest) -> Result<i32> {
    println!("\n🔍 Dry run: generating queries (no provider calls)...\n");

    let queries = orchestrator
        .plan(request)
        .await
        .context("Invalid research request")?;

    if queries.is_empty() {
        println!("   No queries were generated. Is Ollama running?");
    } else {
        for query in &queries {
            println!(
                "     📄 [{}] {} → {}",
                query.family, query.organization, query.text
            );
        }
        println!("\n   Total: {} queries", queries.len());
    }

    println!("\n✅ Dry run complete. No provider calls were made.");
    Ok(0)
}

fn print_summary(report: &PipelineReport) {
    let stats = &report.performance_stats;

    println!("\n📊 Research Summary:");
    println!("   Organizations: {}", report.organization_count);
    println!("   Queries generated: {}", report.queries_generated);
    println!("   Searches executed: {}", report.findings_attempted);
    println!("   Results: {}", report.results.len());
    println!(
        "   Success rate: {:.2} | Avg. evidence: {:.2}",
        stats.success_rate, stats.avg_evidence_per_result
    );
    if stats.failed_requests > 0 || stats.failed_groups > 0 {
        println!(
            "   ⚠️  Failed requests: {} | Failed source groups: {}",
            stats.failed_requests, stats.failed_groups
        );
    }
    println!("   Duration: {:.1}s", report.duration_ms as f64 / 1000.0);
}

fn warn_missing_keys(config: &Config) {
    for message in missing_key_warnings(config) {
        warn!("{}", message);
    }
}

/// News falls back to the web search key when no dedicated key is set.
fn missing_key_warnings(config: &Config) -> Vec<&'static str> {
    let keys = &config.providers;
    let mut warnings = Vec::new();

    if keys.bing_api_key.is_none() {
        warnings.push("No Bing API key configured; the search group will fail");
    }
    if keys.bing_news_api_key.as_ref().or(keys.bing_api_key.as_ref()).is_none() {
        warnings.push("No Bing News API key configured; the news group will fail");
    }
    if keys.rapidapi_key.is_none() {
        warnings.push("No RapidAPI key configured; the jobs group will fail");
    }

    warnings
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

/// Build the request from --request or from flags. Flags override the file.
fn load_request(args: &Args) -> Result<ResearchRequest> {
    let mut request = match args.request {
        Some(ref path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read request file: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse request file: {}", path.display()))?
        }
        None => ResearchRequest::new(args.goal.clone().unwrap_or_default(), args.orgs.clone()),
    };

    if let Some(depth) = args.depth {
        request.search_depth = depth;
    }
    if let Some(max_parallel) = args.max_parallel {
        request.max_parallel_searches = max_parallel;
    }
    if let Some(threshold) = args.threshold {
        request.confidence_threshold = threshold;
    }

    Ok(request)
}

fn build_cache(config: &Config) -> Option<Arc<ResponseCache>> {
    config.cache.enabled.then(|| {
        Arc::new(ResponseCache::new(
            config.cache.dir.clone(),
            config.cache.ttl(),
        ))
    })
}

/// Wire the configured provider adapters into the three fetch groups.
fn build_providers(config: &Config, cache: Option<Arc<ResponseCache>>) -> Providers {
    let web: Arc<dyn ProviderAdapter> =
        Arc::new(BingWebSearch::from_config(&config.providers, cache.clone()));

    Providers {
        search: ProviderRoutes::new().with_all(&config.pipeline.query_families, web),
        news: Arc::new(BingNews::from_config(&config.providers, cache.clone())),
        jobs: Arc::new(JobBoard::from_config(&config.providers, cache)),
    }
}

/// Output path, switched to `.md` when Markdown is requested but only the
/// default JSON file name is configured.
fn output_path(args: &Args, config: &Config) -> PathBuf {
    let path = PathBuf::from(&config.general.output);

    let is_json = path.extension().map_or(false, |ext| ext == "json");
    if args.output.is_none() && args.format == OutputFormat::Markdown && is_json {
        path.with_extension("md")
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchDepth;
    use clap::Parser;

    #[test]
    fn test_load_request_from_flags() {
        let args = Args::try_parse_from([
            "signalscout",
            "--goal",
            "fraud detection",
            "--org",
            "acme.com,globex.io",
            "--threshold",
            "0.7",
        ])
        .unwrap();

        let request = load_request(&args).unwrap();

        assert_eq!(request.research_goal, "fraud detection");
        assert_eq!(request.organizations, vec!["acme.com", "globex.io"]);
        assert_eq!(request.confidence_threshold, 0.7);
        assert_eq!(request.max_parallel_searches, 10);
        assert_eq!(request.search_depth, SearchDepth::Standard);
    }

    #[test]
    fn test_load_request_file_with_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("request.json");
        std::fs::write(
            &path,
            r#"{"research_goal": "layoffs", "company_domains": ["acme.com"], "search_depth": "quick"}"#,
        )
        .unwrap();

        let args = Args::try_parse_from([
            "signalscout",
            "--request",
            path.to_str().unwrap(),
            "--max-parallel",
            "3",
        ])
        .unwrap();

        let request = load_request(&args).unwrap();

        assert_eq!(request.organizations, vec!["acme.com"]);
        assert_eq!(request.search_depth, SearchDepth::Quick);
        assert_eq!(request.max_parallel_searches, 3);
        assert_eq!(request.confidence_threshold, 0.5);
    }

    #[test]
    fn test_load_request_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("request.json");
        std::fs::write(&path, "{not json").unwrap();

        let args =
            Args::try_parse_from(["signalscout", "--request", path.to_str().unwrap()]).unwrap();

        assert!(load_request(&args).is_err());
    }

    #[test]
    fn test_output_path_follows_format() {
        let config = Config::default();

        let args = Args::try_parse_from([
            "signalscout",
            "--goal",
            "g",
            "--org",
            "acme.com",
            "--format",
            "markdown",
        ])
        .unwrap();
        assert_eq!(output_path(&args, &config), PathBuf::from("research_report.md"));

        let args =
            Args::try_parse_from(["signalscout", "--goal", "g", "--org", "acme.com"]).unwrap();
        assert_eq!(output_path(&args, &config), PathBuf::from("research_report.json"));
    }

    #[test]
    fn test_build_providers_routes_every_query_family() {
        let config = Config::default();
        let providers = build_providers(&config, build_cache(&config));

        for family in &config.pipeline.query_families {
            assert!(providers.search.route(*family).is_some());
        }
        assert_eq!(providers.news.name(), "bing-news");
        assert_eq!(providers.jobs.name(), "jsearch");
    }

    #[test]
    fn test_build_cache_follows_config() {
        let mut config = Config::default();
        config.cache.enabled = false;
        assert!(build_cache(&config).is_none());

        config.cache.enabled = true;
        assert!(build_cache(&config).is_some());
    }

    #[test]
    fn test_missing_key_warnings() {
        let mut config = Config::default();
        config.providers.bing_api_key = None;
        config.providers.bing_news_api_key = None;
        config.providers.rapidapi_key = None;
        assert_eq!(missing_key_warnings(&config).len(), 3);

        // a dedicated news key covers only the news group
        config.providers.bing_news_api_key = Some("news-key".to_string());
        let warnings = missing_key_warnings(&config);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.contains("search group")));
        assert!(!warnings.iter().any(|w| w.contains("news group")));

        // the web key doubles as the news key
        config.providers.bing_news_api_key = None;
        config.providers.bing_api_key = Some("web-key".to_string());
        config.providers.rapidapi_key = Some("jobs-key".to_string());
        assert!(missing_key_warnings(&config).is_empty());
    }
}
