// Configuration for the scan pipeline
// All values come from the environment; only the provider API key is mandatory

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Default model served by the vision provider
pub const DEFAULT_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";

/// Default OpenAI-compatible endpoint base
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Scan pipeline configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Bearer token for the vision provider
    pub api_key: String,
    /// OpenAI-compatible endpoint base URL (no trailing slash)
    pub base_url: String,
    /// Model identifier sent with every completion request
    pub model: String,
    /// Hard timeout applied to each upstream attempt
    pub request_timeout: Duration,
    /// Bounded retries on transient transport failures (non-2xx is never retried)
    pub max_retries: u32,
    /// Consecutive upstream failures before the circuit breaker opens
    pub breaker_threshold: u32,
    /// How long the breaker stays open before allowing a probe attempt
    pub breaker_cooldown: Duration,
    /// Per-user scans allowed within one minute bucket
    pub minute_cap: u64,
    /// Per-user scans allowed within one day bucket
    pub daily_cap: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(30),
            max_retries: 2,
            breaker_threshold: 5,
            breaker_cooldown: Duration::from_secs(60),
            minute_cap: 5,
            daily_cap: 25,
        }
    }
}

impl ScanConfig {
    /// Load configuration from the environment.
    ///
    /// `GROQ_API_KEY` is required; everything else falls back to defaults.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY")
            .context("GROQ_API_KEY is not set")?;

        let defaults = Self::default();

        Ok(Self {
            api_key,
            base_url: env_or("GROQ_BASE_URL", defaults.base_url),
            model: env_or("GROQ_MODEL", defaults.model),
            request_timeout: Duration::from_secs(env_parsed(
                "SCAN_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
            max_retries: env_parsed("SCAN_MAX_RETRIES", defaults.max_retries),
            breaker_threshold: env_parsed("SCAN_BREAKER_THRESHOLD", defaults.breaker_threshold),
            breaker_cooldown: defaults.breaker_cooldown,
            minute_cap: env_parsed("SCAN_MINUTE_CAP", defaults.minute_cap),
            daily_cap: env_parsed("SCAN_DAILY_CAP", defaults.daily_cap),
        })
    }
}

/// Resolve the SQLite database path: `RECIBO_DB_PATH` or the platform data dir
pub fn database_path() -> PathBuf {
    if let Ok(path) = std::env::var("RECIBO_DB_PATH") {
        return PathBuf::from(path);
    }

    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("recibo")
        .join("recibo.db")
}

/// Bind address for the HTTP server: `RECIBO_BIND_ADDR` or a local default
pub fn bind_addr() -> String {
    std::env::var("RECIBO_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string())
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
