//! Runtime configuration
//!
//! Everything is sourced from environment variables (with `.env` support
//! via dotenvy) and falls back to sensible demo defaults. Invalid values
//! log a warning and fall back rather than aborting startup.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::completion::RetryPolicy;

/// Settings for the outbound completion service.
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout: Duration,
}

/// Full runtime configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: IpAddr,
    pub port: u16,
    pub completion: CompletionSettings,
    pub retry: RetryPolicy,
    /// Answer cache capacity; generous by default so the demo never sees
    /// eviction
    pub cache_capacity: usize,
    /// Upper bound on stored datasets; uploads are refused past it
    pub max_datasets: usize,
    pub rate_limit_window: Duration,
    pub rate_limit_max_requests: usize,
    /// Directory holding the bundled sample datasets
    pub demo_dir: PathBuf,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            host: env_parse("BIZLENS_HOST", IpAddr::V4(Ipv4Addr::LOCALHOST)),
            port: env_parse("PORT", 3001),
            completion: CompletionSettings {
                endpoint: env_string("COMPLETION_ENDPOINT")
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                model: env_string("COMPLETION_MODEL")
                    .unwrap_or_else(|| "gpt-4o-mini".to_string()),
                api_key: env_string("COMPLETION_API_KEY"),
                temperature: env_parse("COMPLETION_TEMPERATURE", 0.2),
                max_tokens: env_parse("COMPLETION_MAX_TOKENS", 2048),
                request_timeout: Duration::from_secs(env_parse(
                    "COMPLETION_TIMEOUT_SECS",
                    30u64,
                )),
            },
            retry: RetryPolicy {
                max_attempts: env_parse("COMPLETION_MAX_ATTEMPTS", 5),
                base_delay: Duration::from_millis(env_parse("COMPLETION_BASE_DELAY_MS", 1000u64)),
                max_delay: Duration::from_millis(env_parse("COMPLETION_MAX_DELAY_MS", 30_000u64)),
            },
            cache_capacity: env_parse("ANSWER_CACHE_CAPACITY", 10_000),
            max_datasets: env_parse("MAX_DATASETS", 1024),
            rate_limit_window: Duration::from_secs(env_parse("RATE_LIMIT_WINDOW_SECS", 60u64)),
            rate_limit_max_requests: env_parse("RATE_LIMIT_MAX_REQUESTS", 10),
            demo_dir: PathBuf::from(
                env_string("DEMO_DATASETS_DIR").unwrap_or_else(|| "demo-datasets".to_string()),
            ),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    match env_string(key) {
        None => default,
        Some(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("invalid value for {}: {:?}; using default", key, raw);
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_env();
        assert_eq!(settings.rate_limit_max_requests, 10);
        assert_eq!(settings.rate_limit_window, Duration::from_secs(60));
        assert_eq!(settings.retry.max_attempts, 5);
        assert!(settings.max_datasets > 0);
    }
}
