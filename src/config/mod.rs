mod loader;

use serde::{Deserialize, Serialize};
use std::path::Path;

pub use loader::{apply_env_overrides, load_config, ENV_API_KEY, ENV_BASE_URL, ENV_CA_BUNDLE, ENV_INSECURE};

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

/// Relay server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8787,
            host: "127.0.0.1".to_string(),
        }
    }
}

/// Upstream completion API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// API base URL, `/chat/completions` is appended
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer credential; chat requests are refused without it
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub tls: TlsConfig,
}

/// TLS configuration for upstream connections
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TlsConfig {
    /// PEM bundle to trust instead of searching the system locations
    #[serde(default)]
    pub ca_bundle_path: Option<String>,
    /// Skip certificate verification (local debugging only)
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_base_url() -> String {
    "https://api.mistral.ai/v1".to_string()
}

fn default_timeout() -> u64 {
    300
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_seconds: default_timeout(),
            tls: TlsConfig::default(),
        }
    }
}

impl UpstreamConfig {
    /// Returns the base URL with trailing slash stripped
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Returns true if the URL uses HTTPS
    pub fn is_tls(&self) -> bool {
        self.base_url.to_lowercase().starts_with("https://")
    }

    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url())
    }

    /// Configured credential, ignoring blank values
    pub fn credential(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

/// Model candidates
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelsConfig {
    #[serde(default = "default_preferred_model")]
    pub preferred: String,
    /// Lower-capacity alternatives, tried in order
    #[serde(default = "default_fallback_models")]
    pub fallbacks: Vec<String>,
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,
}

fn default_preferred_model() -> String {
    "mistral-large-latest".to_string()
}

fn default_fallback_models() -> Vec<String> {
    vec![
        "mistral-medium-latest".to_string(),
        "mistral-small-latest".to_string(),
    ]
}

fn default_temperature() -> f32 {
    crate::api::DEFAULT_TEMPERATURE
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            preferred: default_preferred_model(),
            fallbacks: default_fallback_models(),
            default_temperature: default_temperature(),
        }
    }
}

impl ModelsConfig {
    /// Ordered candidate list: the override (or preferred model), then the
    /// fallbacks, without duplicates
    pub fn candidates(&self, preferred_override: Option<&str>) -> Vec<String> {
        let preferred = preferred_override
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.preferred.as_str());

        let mut candidates: Vec<String> = Vec::with_capacity(1 + self.fallbacks.len());
        for model in std::iter::once(preferred).chain(self.fallbacks.iter().map(String::as_str)) {
            if !candidates.iter().any(|c| c == model) {
                candidates.push(model.to_string());
            }
        }
        candidates
    }
}

/// Capacity retry and backoff configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Extra attempts for the first candidate after a capacity error
    #[serde(default = "default_preferred_retries")]
    pub preferred_retries: u32,
    /// Extra attempts for each fallback candidate
    #[serde(default)]
    pub fallback_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Regex matched against error bodies to spot capacity errors that do
    /// not come with a 429
    #[serde(default = "default_capacity_pattern")]
    pub capacity_pattern: String,
}

fn default_preferred_retries() -> u32 {
    1
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8000
}

fn default_capacity_pattern() -> String {
    r"(?i)capacity|overloaded".to_string()
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            preferred_retries: default_preferred_retries(),
            fallback_retries: 0,
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            capacity_pattern: default_capacity_pattern(),
        }
    }
}

/// Terminal client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    #[serde(default = "default_relay_url")]
    pub relay_url: String,
}

fn default_relay_url() -> String {
    "http://127.0.0.1:8787".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: default_relay_url(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        load_config(path)
    }

    /// Load configuration, falling back to the default locations and then to
    /// built-in defaults. Environment overrides are applied last.
    pub fn load_or_default(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_paths = ["config.yaml", "config.yml", "./config/config.yaml"];
                match default_paths.iter().map(Path::new).find(|p| p.exists()) {
                    Some(path) => Self::from_file(path)?,
                    None => {
                        tracing::debug!("No config file found, using built-in defaults");
                        Self::default()
                    }
                }
            }
        };

        apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but cannot work
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(self.upstream.base_url())
            .map_err(|e| ConfigError::Validation(format!("invalid upstream.base_url: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "upstream.base_url must be http or https, got {}",
                url.scheme()
            )));
        }

        if self.models.preferred.trim().is_empty() {
            return Err(ConfigError::Validation("models.preferred must not be empty".to_string()));
        }

        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(ConfigError::Validation(
                "retry.max_delay_ms must be >= retry.base_delay_ms".to_string(),
            ));
        }

        regex::Regex::new(&self.retry.capacity_pattern)
            .map_err(|e| ConfigError::Validation(format!("invalid retry.capacity_pattern: {}", e)))?;

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}
