//! Ollama-backed query generator.
//!
//! Sends a single non-streaming chat request per (organization, family)
//! pair and reads one query per line from the reply.

use crate::error::GenerationError;
use crate::models::{Organization, SourceFamily};
use crate::query::QueryGenerator;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Configuration for the query generator.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            temperature: 0.7,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Generates search queries with a local Ollama model.
pub struct OllamaQueryGenerator {
    config: GeneratorConfig,
    http_client: reqwest::Client,
}

impl OllamaQueryGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        info!(
            "Initializing query generator with model {} at {}",
            config.model_name, config.ollama_url
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client for query generation")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    async fn chat(&self, system: String, user: String) -> Result<String, GenerationError> {
        let url = format!("{}/api/chat", self.config.ollama_url.trim_end_matches('/'));

        let request = OllamaChatRequest {
            model: self.config.model_name.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user,
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Request(format!(
                        "timed out after {}s",
                        self.config.timeout_seconds
                    ))
                } else if e.is_connect() {
                    GenerationError::Request(format!(
                        "cannot connect to Ollama at {}",
                        self.config.ollama_url
                    ))
                } else {
                    GenerationError::Request(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status { status, body });
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        Ok(chat_response.message.content)
    }
}

#[async_trait]
impl QueryGenerator for OllamaQueryGenerator {
    async fn generate(
        &self,
        intent: &str,
        organization: &Organization,
        family: SourceFamily,
        n: usize,
    ) -> Result<Vec<String>, GenerationError> {
        debug!(organization = %organization, family = %family, n, "Requesting queries");

        let reply = self
            .chat(system_prompt(intent, organization, family, n), intent.to_string())
            .await?;

        Ok(parse_queries(&reply, n))
    }
}

fn system_prompt(intent: &str, organization: &Organization, family: SourceFamily, n: usize) -> String {
    format!(
        "You are a search query generator for {family}. \
         Given a research goal like '{intent}', generate {n} specific Bing/Google search \
         queries about the organization '{organization}'. \
         Queries must be phrased like real-world user searches. \
         Output one query per line with no numbering or commentary."
    )
}

/// One query per non-empty line, bullets and numbering stripped, at most `n`.
fn parse_queries(reply: &str, n: usize) -> Vec<String> {
    reply
        .lines()
        .map(clean_line)
        .filter(|q| !q.is_empty())
        .take(n)
        .map(String::from)
        .collect()
}

fn clean_line(line: &str) -> &str {
    let line = line.trim().trim_matches(|c: char| matches!(c, '-' | '•' | '*'));
    let line = line.trim();

    // "1." / "2)" enumerations
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    let line = if digits > 0 {
        match line[digits..].chars().next() {
            Some('.') | Some(')') => &line[digits + 1..],
            _ => line,
        }
    } else {
        line
    };

    line.trim().trim_matches('"').trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_config_default() {
        let config = GeneratorConfig::default();
        assert_eq!(config.model_name, "llama3.2:latest");
        assert_eq!(config.ollama_url, "http://localhost:11434");
    }

    #[test]
    fn test_parse_queries_strips_bullets_and_numbering() {
        let reply = "\n- acme layoffs 2024\n• acme job cuts\n3. \"acme restructuring\"\n\n4) acme hiring freeze\n";

        let queries = parse_queries(reply, 10);

        assert_eq!(
            queries,
            vec![
                "acme layoffs 2024",
                "acme job cuts",
                "acme restructuring",
                "acme hiring freeze"
            ]
        );
    }

    #[test]
    fn test_parse_queries_keeps_at_most_n() {
        let reply = "a\nb\nc\nd";
        assert_eq!(parse_queries(reply, 2), vec!["a", "b"]);
        assert!(parse_queries("", 5).is_empty());
    }

    #[test]
    fn test_leading_year_is_not_numbering() {
        assert_eq!(clean_line("2024 acme funding"), "2024 acme funding");
    }

    #[test]
    fn test_system_prompt_mentions_pair() {
        let prompt = system_prompt(
            "AI fraud detection adoption",
            &Organization::new("acme.com"),
            SourceFamily::Jobs,
            5,
        );
        assert!(prompt.contains("jobs"));
        assert!(prompt.contains("acme.com"));
        assert!(prompt.contains("generate 5"));
    }

    #[tokio::test]
    async fn test_unreachable_ollama_is_a_generation_error() {
        let generator = OllamaQueryGenerator::new(GeneratorConfig {
            ollama_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 2,
            ..GeneratorConfig::default()
        })
        .unwrap();

        let result = generator
            .generate("goal", &Organization::new("acme.com"), SourceFamily::News, 3)
            .await;

        assert!(matches!(result, Err(GenerationError::Request(_))));
    }
}
