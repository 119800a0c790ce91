use std::path::Path;

use super::{AppConfig, ConfigError};

/// Upstream credential
pub const ENV_API_KEY: &str = "MISTRAL_API_KEY";
/// Upstream base URL override
pub const ENV_BASE_URL: &str = "MISTRAL_BASE_URL";
/// Custom certificate bundle path
pub const ENV_CA_BUNDLE: &str = "MISTRAL_CA_BUNDLE";
/// Disable certificate verification (debug only)
pub const ENV_INSECURE: &str = "MISTRAL_INSECURE_SKIP_VERIFY";

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_yaml::from_str(&content)?;

    Ok(config)
}

/// Apply environment overrides on top of file values.
///
/// `lookup` is `std::env::var` in production; tests pass a map.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(key) = non_empty(ENV_API_KEY) {
        config.upstream.api_key = Some(key);
    }
    if let Some(url) = non_empty(ENV_BASE_URL) {
        config.upstream.base_url = url;
    }
    if let Some(path) = non_empty(ENV_CA_BUNDLE) {
        config.upstream.tls.ca_bundle_path = Some(path);
    }
    if let Some(flag) = non_empty(ENV_INSECURE) {
        config.upstream.tls.accept_invalid_certs = matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_missing_config() {
        let result = load_config("/nonexistent/config.yaml");
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_config_invalid_yaml() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let temp_file = temp_dir.path().join("invalid.yaml");
        std::fs::write(&temp_file, "invalid: yaml: content: [").unwrap();

        let result = load_config(&temp_file);
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_valid() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let temp_file = temp_dir.path().join("config.yaml");

        let config_content = r#"
server:
  port: 9000
  host: "0.0.0.0"

upstream:
  base_url: "http://localhost:18080/v1"
  api_key: "sk-file"
  timeout_seconds: 60
  tls:
    ca_bundle_path: "/etc/ssl/custom.pem"

models:
  preferred: "mistral-large-latest"
  fallbacks: ["mistral-small-latest"]
  default_temperature: 0.5

retry:
  preferred_retries: 2
  fallback_retries: 1
  base_delay_ms: 10
  max_delay_ms: 100
  capacity_pattern: "capacity"

client:
  relay_url: "http://127.0.0.1:9000"
"#;
        std::fs::write(&temp_file, config_content).unwrap();

        let config = load_config(&temp_file).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.upstream.base_url(), "http://localhost:18080/v1");
        assert_eq!(config.upstream.credential(), Some("sk-file"));
        assert_eq!(config.upstream.timeout_seconds, 60);
        assert_eq!(config.upstream.tls.ca_bundle_path.as_deref(), Some("/etc/ssl/custom.pem"));
        assert_eq!(config.models.fallbacks, vec!["mistral-small-latest"]);
        assert_eq!(config.retry.preferred_retries, 2);
        assert_eq!(config.retry.fallback_retries, 1);
        assert_eq!(config.client.relay_url, "http://127.0.0.1:9000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config_minimal() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let temp_file = temp_dir.path().join("minimal.yaml");
        std::fs::write(&temp_file, "upstream:\n  api_key: \"sk-min\"\n").unwrap();

        let config = load_config(&temp_file).unwrap();
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.upstream.base_url, "https://api.mistral.ai/v1");
        assert_eq!(config.models.candidates(None).len(), 3);
        assert_eq!(config.retry.preferred_retries, 1);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                (ENV_API_KEY, "sk-env"),
                (ENV_BASE_URL, "http://localhost:9999/v1"),
                (ENV_CA_BUNDLE, "/tmp/bundle.pem"),
                (ENV_INSECURE, "true"),
            ]),
        );

        assert_eq!(config.upstream.credential(), Some("sk-env"));
        assert_eq!(config.upstream.base_url, "http://localhost:9999/v1");
        assert_eq!(config.upstream.tls.ca_bundle_path.as_deref(), Some("/tmp/bundle.pem"));
        assert!(config.upstream.tls.accept_invalid_certs);
    }

    #[test]
    fn test_env_overrides_ignore_blank_and_keep_file_values() {
        let mut config = AppConfig::default();
        config.upstream.api_key = Some("sk-file".to_string());

        apply_env_overrides(&mut config, env(&[(ENV_API_KEY, "  "), (ENV_INSECURE, "0")]));

        assert_eq!(config.upstream.credential(), Some("sk-file"));
        assert!(!config.upstream.tls.accept_invalid_certs);
    }

    #[test]
    fn test_config_from_file() {
        let result = AppConfig::from_file("/nonexistent/path.yaml");
        assert!(result.is_err());
    }
}
