//! Runtime configuration.
//!
//! Defaults are overlaid by `HELPDESK_*` environment variables, e.g.
//! `HELPDESK_DATABASE_URL` or `HELPDESK_MAX_PAGE_SIZE`.

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "HELPDESK";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SupportConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub default_page_size: i64,
    pub max_page_size: i64,
    /// Read by `seed::seed_on_startup`.
    pub seed_defaults: bool,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/helpdesk".to_string(),
            max_connections: 10,
            default_page_size: 10,
            max_page_size: 100,
            seed_defaults: true,
        }
    }
}

impl SupportConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::with_prefix(ENV_PREFIX))
    }

    fn from_environment(env: Environment) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config: SupportConfig = Config::builder()
            .set_default("database_url", defaults.database_url)?
            .set_default("max_connections", defaults.max_connections)?
            .set_default("default_page_size", defaults.default_page_size)?
            .set_default("max_page_size", defaults.max_page_size)?
            .set_default("seed_defaults", defaults.seed_defaults)?
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Message("max_connections must be at least 1".into()));
        }
        if self.default_page_size < 1 || self.max_page_size < self.default_page_size {
            return Err(ConfigError::Message(format!(
                "page sizes must satisfy 1 <= default ({}) <= max ({})",
                self.default_page_size, self.max_page_size
            )));
        }
        Ok(())
    }

    /// Clamps a requested page size into `1..=max_page_size`.
    pub fn page_size(&self, requested: Option<i64>) -> i64 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = SupportConfig::from_environment(env(&[])).unwrap();
        assert_eq!(config, SupportConfig::default());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = SupportConfig::from_environment(env(&[
            ("HELPDESK_MAX_PAGE_SIZE", "50"),
            ("HELPDESK_SEED_DEFAULTS", "false"),
        ]))
        .unwrap();
        assert_eq!(config.max_page_size, 50);
        assert!(!config.seed_defaults);
        assert_eq!(config.default_page_size, 10);
    }

    #[test]
    fn rejects_inverted_page_sizes() {
        let result = SupportConfig::from_environment(env(&[
            ("HELPDESK_DEFAULT_PAGE_SIZE", "20"),
            ("HELPDESK_MAX_PAGE_SIZE", "5"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn page_size_is_clamped() {
        let config = SupportConfig::default();
        assert_eq!(config.page_size(None), 10);
        assert_eq!(config.page_size(Some(0)), 1);
        assert_eq!(config.page_size(Some(500)), 100);
    }
}
