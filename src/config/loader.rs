//! Configuration loader with environment variable expansion and overrides

use super::{expand_env_vars, Config, ConfigError};
use ::config::{Environment, File, FileFormat};
use std::path::Path;

/// Prefix of environment overrides, e.g. `EDULANG_AUTH__JWT_SECRET`
pub const ENV_PREFIX: &str = "EDULANG";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// `${VAR}` placeholders are expanded first, then `EDULANG_*` variables
    /// override individual keys (nested keys separated by `__`).
    pub fn from_yaml_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = expand_env_vars(content);

        let config: Config = ::config::Config::builder()
            .add_source(File::from_str(&expanded, FileFormat::Yaml))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }
}
