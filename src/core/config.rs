//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Configuration for the job client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub max_input_tokens: u32,
    pub max_output_tokens: u32,
    pub max_requests_per_minute: u32,
    pub max_tokens_per_minute: u32,
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("TRANSLATOR_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            api_key: std::env::var("TRANSLATOR_API_KEY").unwrap_or_default(),
            max_input_tokens: 4000,
            max_output_tokens: 6000,
            max_requests_per_minute: 15,
            max_tokens_per_minute: 1_000_000,
            poll_interval_ms: 20_000,
            timeout_ms: 30_000,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = std::env::var("TRANSLATOR_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());

        let api_key = std::env::var("TRANSLATOR_API_KEY").unwrap_or_default();

        let max_input_tokens = std::env::var("MAX_INPUT_TOKENS")
            .unwrap_or_else(|_| "4000".to_string())
            .parse::<u32>()?;

        let max_output_tokens = std::env::var("MAX_OUTPUT_TOKENS")
            .unwrap_or_else(|_| "6000".to_string())
            .parse::<u32>()?;

        let max_requests_per_minute = std::env::var("MAX_REQUESTS_PER_MINUTE")
            .unwrap_or_else(|_| "15".to_string())
            .parse::<u32>()?;

        let max_tokens_per_minute = std::env::var("MAX_TOKENS_PER_MINUTE")
            .unwrap_or_else(|_| "1000000".to_string())
            .parse::<u32>()?;

        let poll_interval_ms = std::env::var("POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "20000".to_string())
            .parse::<u64>()?;

        let timeout_ms = std::env::var("REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".to_string())
            .parse::<u64>()?;

        Ok(Self {
            base_url,
            api_key,
            max_input_tokens,
            max_output_tokens,
            max_requests_per_minute,
            max_tokens_per_minute,
            poll_interval_ms,
            timeout_ms,
        })
    }

    /// Load from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.is_empty() {
            return Err(anyhow::anyhow!("base_url is required"));
        }

        if self.api_key.is_empty() {
            warn!("No API key configured");
        }

        if self.max_input_tokens == 0 || self.max_output_tokens == 0 {
            return Err(anyhow::anyhow!("token limits must be greater than 0"));
        }

        if self.max_requests_per_minute == 0 || self.max_tokens_per_minute == 0 {
            return Err(anyhow::anyhow!("rate limits must be greater than 0"));
        }

        if self.poll_interval_ms == 0 {
            return Err(anyhow::anyhow!("poll_interval_ms must be greater than 0"));
        }

        Ok(())
    }

    /// Endpoint for job submission
    pub fn submit_url(&self) -> String {
        format!("{}/translate-book/", self.base_url.trim_end_matches('/'))
    }

    /// Endpoint for status checks
    pub fn status_url(&self, task_id: &str) -> String {
        format!("{}/task-status/{}", self.base_url.trim_end_matches('/'), task_id)
    }

    /// Endpoint for artifact download
    pub fn download_url(&self, task_id: &str) -> String {
        format!("{}/download/{}", self.base_url.trim_end_matches('/'), task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let config = ClientConfig {
            base_url: "http://localhost:8000".to_string(),
            api_key: "test_key".to_string(),
            ..Default::default()
        };

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_missing_base_url() {
        let config = ClientConfig {
            base_url: "".to_string(),
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_limits() {
        let config = ClientConfig {
            max_requests_per_minute: 0,
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint_urls() {
        let config = ClientConfig {
            base_url: "http://localhost:8000/".to_string(),
            ..Default::default()
        };

        assert_eq!(config.submit_url(), "http://localhost:8000/translate-book/");
        assert_eq!(
            config.status_url("abc123"),
            "http://localhost:8000/task-status/abc123"
        );
        assert_eq!(
            config.download_url("abc123"),
            "http://localhost:8000/download/abc123"
        );
    }
}
