//! Configuration module for EduLang
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion, `EDULANG_*` overrides and validation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in a string.
///
/// Supports two syntaxes:
/// - `${VAR_NAME}` - Simple expansion, keeps placeholder if var not found
/// - `${VAR_NAME:-default}` - Expansion with default value
///
/// # Examples
///
/// ```ignore
/// std::env::set_var("MY_VAR", "value");
/// let result = expand_env_vars("prefix-${MY_VAR}-suffix");
/// assert_eq!(result, "prefix-value-suffix");
///
/// let result = expand_env_vars("${MISSING:-default}");
/// assert_eq!(result, "default");
/// ```
pub(crate) fn expand_env_vars(s: &str) -> String {
    let re = match regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}") {
        Ok(re) => re,
        Err(_) => return s.to_string(),
    };
    let mut last_match = 0;
    let mut result = String::with_capacity(s.len());

    for cap in re.captures_iter(s) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };

        result.push_str(&s[last_match..full_match.start()]);

        let value = match std::env::var(var_name.as_str()) {
            Ok(val) => val,
            Err(_) => match cap.get(2) {
                Some(default) => default.as_str().to_string(),
                // No env var and no default. Keep the original placeholder.
                None => full_match.as_str().to_string(),
            },
        };
        result.push_str(&value);

        last_match = full_match.end();
    }

    result.push_str(&s[last_match..]);
    result
}

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate that a URL starts with http:// or https://
fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Longest lifetime S3 accepts for a SigV4 presigned URL (7 days).
pub const MAX_PRESIGN_EXPIRY_SECS: u64 = 604_800;

/// Longest accepted session token lifetime (one year).
pub const MAX_TOKEN_TTL_SECS: u64 = 31_536_000;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.address.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "server.address cannot be empty".into(),
            ));
        }

        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.jwt_secret cannot be empty".into(),
            ));
        }

        if self.auth.token_ttl_secs == 0 || self.auth.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::ValidationError(format!(
                "Invalid auth.token_ttl_secs {}: must be between 1 and {}",
                self.auth.token_ttl_secs, MAX_TOKEN_TTL_SECS
            )));
        }

        if self.auth.cookie_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.cookie_name cannot be empty".into(),
            ));
        }

        if self.storage.bucket.trim().is_empty() || self.storage.region.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.bucket and storage.region are required".into(),
            ));
        }

        if self.storage.presign_expiry_secs == 0
            || self.storage.presign_expiry_secs > MAX_PRESIGN_EXPIRY_SECS
        {
            return Err(ConfigError::ValidationError(format!(
                "Invalid storage.presign_expiry_secs {}: must be between 1 and {}",
                self.storage.presign_expiry_secs, MAX_PRESIGN_EXPIRY_SECS
            )));
        }

        if let Some(ref endpoint) = self.storage.endpoint {
            if !is_valid_http_url(endpoint) {
                return Err(ConfigError::ValidationError(
                    "Invalid storage.endpoint: must start with http:// or https://".into(),
                ));
            }
        }

        if self.storage.access_key.is_some() != self.storage.secret_key.is_some() {
            return Err(ConfigError::ValidationError(
                "storage.access_key and storage.secret_key must be set together".into(),
            ));
        }

        for (name, url) in [
            ("ai.text_extraction_url", &self.ai.text_extraction_url),
            ("ai.translate_url", &self.ai.translate_url),
            ("ai.text_to_speech_url", &self.ai.text_to_speech_url),
        ] {
            if let Some(url) = url {
                if !is_valid_http_url(url) {
                    return Err(ConfigError::ValidationError(format!(
                        "Invalid {}: must start with http:// or https://",
                        name
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub address: String,
}

/// Session and password configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_cookie_max_age")]
    pub cookie_max_age_secs: u64,
    #[serde(default)]
    pub secure_cookies: bool,
    /// Tokens credited to a new account at signup
    #[serde(default = "default_initial_tokens")]
    pub initial_tokens: u32,
}

impl AuthConfig {
    /// Auth settings with the defaults for everything except the secret
    pub fn with_secret(secret: &str) -> Self {
        Self {
            jwt_secret: secret.to_string(),
            token_ttl_secs: default_token_ttl(),
            cookie_name: default_cookie_name(),
            cookie_max_age_secs: default_cookie_max_age(),
            secure_cookies: false,
            initial_tokens: default_initial_tokens(),
        }
    }
}

fn default_token_ttl() -> u64 {
    604_800 // 7 days
}

fn default_cookie_name() -> String {
    "auth-token".to_string()
}

fn default_cookie_max_age() -> u64 {
    86_400 // 1 day
}

fn default_initial_tokens() -> u32 {
    1000
}

/// Document storage (S3) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default = "default_presign_expiry")]
    pub presign_expiry_secs: u64,
    #[serde(default = "default_public_read")]
    pub public_read: bool,
}

fn default_presign_expiry() -> u64 {
    3600
}

fn default_public_read() -> bool {
    true
}

/// Endpoints of the external AI services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub text_extraction_url: Option<String>,
    #[serde(default)]
    pub translate_url: Option<String>,
    #[serde(default)]
    pub text_to_speech_url: Option<String>,
    #[serde(default = "default_ai_timeout")]
    pub timeout_seconds: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            text_extraction_url: None,
            translate_url: None,
            text_to_speech_url: None,
            timeout_seconds: default_ai_timeout(),
        }
    }
}

fn default_ai_timeout() -> u64 {
    60
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_port() -> u16 {
    9090
}
