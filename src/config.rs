//! Environment-based configuration.
//!
//! Settings are loaded once at process start (the binary calls
//! `dotenvy::dotenv()` first so a `.env` file works) and are immutable
//! afterwards. Every recognized variable has a default; an unparseable
//! value fails startup instead of being silently defaulted.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::retry::RetryPolicy;

const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_JUPITER_BASE_URL: &str = "https://lite-api.jup.ag";
const DEFAULT_DEXSCREENER_BASE_URL: &str = "https://api.dexscreener.com/latest/dex";
const DEFAULT_COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: String,
        value: String,
        reason: String,
    },
}

/// Process-wide settings, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub retry: RetryPolicy,
    pub http: HttpSettings,
    pub providers: ProviderSettings,
}

/// Outbound HTTP client settings shared by all data clients.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Per-request timeout.
    pub timeout: Duration,
    /// User-Agent header sent to providers.
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: concat!("swarms-tools/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Provider endpoints and credentials.
///
/// Base URLs are overridable so tests and self-hosted mirrors can point the
/// clients elsewhere.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub yahoo_base_url: String,
    pub jupiter_base_url: String,
    pub dexscreener_base_url: String,
    pub coingecko_base_url: String,
    /// Optional CoinGecko API key; the public endpoints work without one
    /// but are rate-limited harder.
    pub coingecko_api_key: Option<SecretString>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            yahoo_base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
            jupiter_base_url: DEFAULT_JUPITER_BASE_URL.to_string(),
            dexscreener_base_url: DEFAULT_DEXSCREENER_BASE_URL.to_string(),
            coingecko_base_url: DEFAULT_COINGECKO_BASE_URL.to_string(),
            coingecko_api_key: None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            http: HttpSettings::default(),
            providers: ProviderSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Some(attempts) = parse_var::<u32>("SWARMS_RETRY_MAX_ATTEMPTS")? {
            if attempts == 0 {
                return Err(ConfigError::Invalid {
                    var: "SWARMS_RETRY_MAX_ATTEMPTS".into(),
                    value: "0".into(),
                    reason: "must be at least 1".into(),
                });
            }
            settings.retry.max_attempts = attempts;
        }
        if let Some(ms) = parse_var::<u64>("SWARMS_RETRY_BASE_DELAY_MS")? {
            settings.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>("SWARMS_RETRY_MAX_DELAY_MS")? {
            settings.retry.max_delay = Duration::from_millis(ms);
        }
        if let Some(jitter) = parse_var::<bool>("SWARMS_RETRY_JITTER")? {
            settings.retry.jitter = jitter;
        }

        if let Some(secs) = parse_var::<u64>("SWARMS_HTTP_TIMEOUT_SECS")? {
            settings.http.timeout = Duration::from_secs(secs);
        }

        if let Ok(url) = env::var("SWARMS_YAHOO_BASE_URL") {
            settings.providers.yahoo_base_url = url;
        }
        if let Ok(url) = env::var("SWARMS_JUPITER_BASE_URL") {
            settings.providers.jupiter_base_url = url;
        }
        if let Ok(url) = env::var("SWARMS_DEXSCREENER_BASE_URL") {
            settings.providers.dexscreener_base_url = url;
        }
        if let Ok(url) = env::var("SWARMS_COINGECKO_BASE_URL") {
            settings.providers.coingecko_base_url = url;
        }
        if let Ok(key) = env::var("SWARMS_COINGECKO_API_KEY") {
            if !key.is_empty() {
                settings.providers.coingecko_api_key = Some(SecretString::from(key));
            }
        }

        Ok(settings)
    }
}

/// Read and parse an optional environment variable.
fn parse_var<T: FromStr>(var: &str) -> Result<Option<T>, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw.parse::<T>().map(Some).map_err(|_| ConfigError::Invalid {
            var: var.to_string(),
            value: raw,
            reason: format!("expected {}", std::any::type_name::<T>()),
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();

        assert_eq!(settings.retry.max_attempts, 3);
        assert!(settings.retry.jitter);
        assert_eq!(settings.http.timeout, Duration::from_secs(10));
        assert!(settings.http.user_agent.starts_with("swarms-tools/"));
        assert_eq!(settings.providers.yahoo_base_url, DEFAULT_YAHOO_BASE_URL);
        assert!(settings.providers.coingecko_api_key.is_none());
    }

    #[test]
    fn test_parse_var_absent() {
        let parsed: Option<u32> = parse_var("SWARMS_TEST_DOES_NOT_EXIST").unwrap();
        assert!(parsed.is_none());
    }
}
