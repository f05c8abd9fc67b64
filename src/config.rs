use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Credentials and overrides for one provider.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// API key; the provider is inactive without one
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model name override
    #[serde(default)]
    pub model: Option<String>,

    /// Endpoint override (e.g. a local mock server)
    #[serde(default)]
    pub base_url: Option<String>,
}

impl ProviderSettings {
    /// Read `<PREFIX>_API_KEY`, `<PREFIX>_MODEL` and `<PREFIX>_BASE_URL`.
    pub fn from_env(prefix: &str) -> Self {
        Self {
            api_key: env_var(&format!("{prefix}_API_KEY")),
            model: env_var(&format!("{prefix}_MODEL")),
            base_url: env_var(&format!("{prefix}_BASE_URL")),
        }
    }

    /// Some(self) when a non-empty key is configured.
    pub fn active(&self) -> Option<&Self> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Some(self),
            _ => None,
        }
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Runtime configuration for the server, CLI and pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub groq: ProviderSettings,

    #[serde(default)]
    pub openai: ProviderSettings,

    #[serde(default)]
    pub anthropic: ProviderSettings,

    #[serde(default)]
    pub google: ProviderSettings,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Origins allowed by CORS
    #[serde(default = "default_frontend_origins")]
    pub frontend_origins: Vec<String>,

    /// Advisory per-client request budget
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: usize,

    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    #[serde(default = "default_retry_max_ms")]
    pub retry_max_ms: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_frontend_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:3001".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

fn default_rate_limit() -> usize {
    60
}

fn default_provider_timeout() -> u64 {
    60
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_base_ms() -> u64 {
    4_000
}

fn default_retry_max_ms() -> u64 {
    10_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            groq: ProviderSettings::default(),
            openai: ProviderSettings::default(),
            anthropic: ProviderSettings::default(),
            google: ProviderSettings::default(),
            bind_addr: default_bind_addr(),
            frontend_origins: default_frontend_origins(),
            rate_limit_per_minute: default_rate_limit(),
            provider_timeout_secs: default_provider_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_base_ms: default_retry_base_ms(),
            retry_max_ms: default_retry_max_ms(),
        }
    }
}

impl Config {
    /// Build from the process environment, loading `.env` first if present.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("Loaded environment from {}", path.display());
        }

        let mut config = Self {
            groq: ProviderSettings::from_env("GROQ"),
            openai: ProviderSettings::from_env("OPENAI"),
            anthropic: ProviderSettings::from_env("ANTHROPIC"),
            google: ProviderSettings::from_env("GOOGLE"),
            ..Self::default()
        };

        if let Some(addr) = env_var("FORGE_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(origin) = env_var("FRONTEND_URL") {
            if !config.frontend_origins.contains(&origin) {
                config.frontend_origins.push(origin);
            }
        }
        env_parse("FORGE_RATE_LIMIT_PER_MINUTE", &mut config.rate_limit_per_minute);
        env_parse("FORGE_PROVIDER_TIMEOUT_SECS", &mut config.provider_timeout_secs);
        env_parse("FORGE_FETCH_TIMEOUT_SECS", &mut config.fetch_timeout_secs);
        env_parse("FORGE_RETRY_ATTEMPTS", &mut config.retry_attempts);
        env_parse("FORGE_RETRY_BASE_MS", &mut config.retry_base_ms);
        env_parse("FORGE_RETRY_MAX_MS", &mut config.retry_max_ms);

        config
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts.max(1),
            base_delay: Duration::from_millis(self.retry_base_ms),
            max_delay: Duration::from_millis(self.retry_max_ms),
        }
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

// Empty values count as unset.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, target: &mut T) {
    if let Some(raw) = env_var(name) {
        match raw.parse() {
            Ok(value) => *target = value,
            Err(_) => log::warn!("Ignoring invalid value for {name}: {raw:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_partial_json() {
        let config: Config =
            serde_json::from_str(r#"{"groq": {"api_key": "gsk"}, "retry_attempts": 2}"#).unwrap();
        assert!(config.groq.active().is_some());
        assert!(config.openai.active().is_none());
        assert_eq!(config.bind_addr, "0.0.0.0:5000");
        assert_eq!(config.rate_limit_per_minute, 60);
        assert_eq!(config.retry_policy().max_attempts, 2);
        assert_eq!(config.retry_policy().base_delay, Duration::from_secs(4));
    }

    #[test]
    fn test_blank_key_is_inactive() {
        let settings = ProviderSettings {
            api_key: Some("   ".into()),
            ..ProviderSettings::default()
        };
        assert!(settings.active().is_none());
    }

    #[test]
    fn test_debug_redacts_key() {
        let settings = ProviderSettings {
            api_key: Some("secret-key".into()),
            ..ProviderSettings::default()
        };
        let printed = format!("{settings:?}");
        assert!(!printed.contains("secret-key"));
        assert!(printed.contains("<redacted>"));
    }
}
