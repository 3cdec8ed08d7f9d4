//! Configuration for the policy rule store.
//!
//! Values come from an optional configuration file (any format the `config`
//! crate understands) overlaid with `POLICY_STORE__*` environment variables,
//! e.g. `POLICY_STORE__STORE__URL=postgres://...`.

use crate::store::Backend;
use crate::{Error, Result};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "POLICY_STORE";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Relational store settings
    pub store: StoreConfig,
    /// Logging and metrics settings
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self> {
        Self::load(None::<&Path>)
    }

    /// Load configuration from an optional file, overlaid with the environment.
    pub fn load(path: Option<impl AsRef<Path>>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.as_ref()).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.store.validate()
    }
}

/// Relational store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database back-end
    pub backend: Backend,
    /// Connection URL
    pub url: String,
    /// Table holding the rules
    pub table_name: String,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
    /// Create the table on startup if it does not exist
    pub create_table: bool,
    /// Enforce uniqueness of whole rules with an index
    pub unique_rules: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            url: "sqlite::memory:".to_string(),
            table_name: "policy_rules".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            create_table: true,
            unique_rules: false,
        }
    }
}

impl StoreConfig {
    /// Pool acquire timeout.
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Validate store settings.
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(Error::config_key("database URL cannot be empty", "store.url"));
        }
        self.backend.check_url(&self.url)?;
        validate_table_name(&self.table_name)?;
        if self.max_connections == 0 {
            return Err(Error::config_key(
                "max_connections must be greater than zero",
                "store.max_connections",
            ));
        }
        Ok(())
    }
}

/// Check that a table name is a plain SQL identifier.
pub fn validate_table_name(name: &str) -> Result<()> {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    let identifier = IDENTIFIER.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("identifier pattern is valid")
    });

    if identifier.is_match(name) {
        Ok(())
    } else {
        Err(Error::config_key(
            format!("invalid table name '{}'", name),
            "store.table_name",
        ))
    }
}

/// Logging and metrics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Whether operation metrics are recorded
    pub enabled: bool,
    /// Service name attached to log output
    pub service_name: String,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit JSON log lines
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: "policy-rule-store".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.store.table_name, "policy_rules");
        assert!(config.telemetry.enabled);
    }

    #[test]
    fn test_table_name_validation() {
        assert!(validate_table_name("policy_rules").is_ok());
        assert!(validate_table_name("_rules2").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("2rules").is_err());
        assert!(validate_table_name("rules; DROP TABLE x").is_err());
    }

    #[test]
    fn test_backend_url_mismatch() {
        let config = StoreConfig {
            backend: Backend::Postgres,
            url: "sqlite::memory:".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_zero_connections_rejected() {
        let config = StoreConfig {
            max_connections: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[store]\nbackend = \"postgres\"\nurl = \"postgres://localhost/rules\"\nunique_rules = true\n\n[telemetry]\njson_logs = true"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.store.backend, Backend::Postgres);
        assert_eq!(config.store.url, "postgres://localhost/rules");
        assert!(config.store.unique_rules);
        assert_eq!(config.store.table_name, "policy_rules");
        assert!(config.telemetry.json_logs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("POLICY_STORE__STORE__ACQUIRE_TIMEOUT_SECS", "7");
        let config = Config::from_env();
        std::env::remove_var("POLICY_STORE__STORE__ACQUIRE_TIMEOUT_SECS");

        let config = config.unwrap();
        assert_eq!(config.store.acquire_timeout(), Duration::from_secs(7));
    }
}
