//! Wayfinder configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Later sources override earlier ones:
//!
//! 1. **Compiled defaults**: the `Default` implementations below
//! 2. **Config file**: TOML file named by `WAYFINDER_CONFIG` (default `config/wayfinder.toml`)
//! 3. **Environment variables**: `WAYFINDER__<SECTION>__<FIELD>`
//!
//! # Example
//!
//! ```toml
//! [gateways]
//! urls = ["https://arweave.net", "https://ar-io.dev"]
//! cache_ttl_seconds = 300
//!
//! [routing]
//! strategy = "fastest-ping"
//! ping_timeout_ms = 500
//!
//! [verification]
//! enabled = true
//! strategies = ["hash"]
//! trusted_gateways = ["https://arweave.net", "https://permagate.io"]
//! min_trusted_responses = 2
//! ```

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use url::Url;

use crate::types::{parse_gateway_url, SortBy, SortOrder};

/// Gateway candidate settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaysConfig {
    /// Static gateway list.
    pub urls: Vec<String>,
    /// Snapshot TTL. `0` disables caching.
    pub cache_ttl_seconds: u64,
    /// Hostnames never selected by filtering strategies.
    pub blocklist: Vec<String>,
}

impl Default for GatewaysConfig {
    fn default() -> Self {
        Self {
            urls: vec!["https://arweave.net".to_string()],
            cache_ttl_seconds: 60,
            blocklist: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingStrategyKind {
    Fixed,
    Random,
    Priority,
    RoundRobin,
    #[default]
    FastestPing,
    Preferred,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub strategy: RoutingStrategyKind,
    /// Target of the `fixed` strategy.
    pub fixed_gateway: Option<String>,
    /// Preferred endpoint of the `preferred` strategy.
    pub preferred_gateway: Option<String>,
    pub ping_timeout_ms: u64,
    pub probe_path: String,
    /// Probes in flight at once. Unset probes every candidate concurrently.
    pub max_concurrency: Option<usize>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    /// Top-N window of the `priority` strategy.
    pub limit: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            strategy: RoutingStrategyKind::default(),
            fixed_gateway: None,
            preferred_gateway: None,
            ping_timeout_ms: 500,
            probe_path: "ar-io/info".to_string(),
            max_concurrency: None,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            limit: 1,
        }
    }
}

impl RoutingConfig {
    #[must_use]
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationStrategyKind {
    Hash,
    DataRoot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    pub enabled: bool,
    /// More than one entry builds a composite strategy.
    pub strategies: Vec<VerificationStrategyKind>,
    pub trusted_gateways: Vec<String>,
    /// Per trusted gateway timeout.
    pub timeout_ms: u64,
    pub min_trusted_responses: usize,
    /// Await verification before returning and fail the request on error.
    pub strict: bool,
    /// How long a stream consumer may stall before it is disconnected.
    pub lag_timeout_ms: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            strategies: vec![VerificationStrategyKind::Hash],
            trusted_gateways: vec!["https://arweave.net".to_string()],
            timeout_ms: 5_000,
            min_trusted_responses: 2,
            strict: false,
            lag_timeout_ms: 30_000,
        }
    }
}

impl VerificationConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub fn lag_timeout(&self) -> Duration {
        Duration::from_millis(self.lag_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub concurrent_limit: usize,
    pub permit_timeout_ms: u64,
    pub connect_timeout_seconds: u64,
    pub request_timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            concurrent_limit: 256,
            permit_timeout_ms: 2_000,
            connect_timeout_seconds: 5,
            request_timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WayfinderConfig {
    pub gateways: GatewaysConfig,
    pub routing: RoutingConfig,
    pub verification: VerificationConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

impl WayfinderConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// A missing file is not an error. Nested fields are overridden with `__`, e.g.
    /// `WAYFINDER__ROUTING__STRATEGY=random`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be parsed or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("WAYFINDER").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Loads from `WAYFINDER_CONFIG`, falling back to `config/wayfinder.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("WAYFINDER_CONFIG")
            .unwrap_or_else(|_| "config/wayfinder.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Checks URLs and numeric bounds.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        let check = |raw: &str, what: &str| -> Result<Url, String> {
            parse_gateway_url(raw).map_err(|e| format!("Invalid {what}: {e}"))
        };

        for url in &self.gateways.urls {
            check(url, "gateway URL")?;
        }

        match self.routing.strategy {
            RoutingStrategyKind::Fixed => {
                let gateway = self
                    .routing
                    .fixed_gateway
                    .as_deref()
                    .ok_or("Fixed routing requires routing.fixed_gateway")?;
                check(gateway, "fixed gateway")?;
            }
            RoutingStrategyKind::Preferred => {
                let gateway = self
                    .routing
                    .preferred_gateway
                    .as_deref()
                    .ok_or("Preferred routing requires routing.preferred_gateway")?;
                check(gateway, "preferred gateway")?;
            }
            RoutingStrategyKind::RoundRobin if self.gateways.urls.is_empty() => {
                return Err("Round-robin routing requires at least one gateway URL".to_string());
            }
            _ => {}
        }

        if self.gateways.urls.is_empty() && self.routing.strategy != RoutingStrategyKind::Fixed {
            return Err("No gateway URLs configured".to_string());
        }

        if self.routing.ping_timeout_ms == 0 {
            return Err("Ping timeout must be greater than 0".to_string());
        }

        if self.routing.limit == 0 {
            return Err("Priority limit must be greater than 0".to_string());
        }

        if self.routing.max_concurrency == Some(0) {
            return Err("Ping concurrency must be greater than 0".to_string());
        }

        if self.verification.enabled {
            if self.verification.strategies.is_empty() {
                return Err("Verification enabled without any strategy".to_string());
            }
            if self.verification.trusted_gateways.is_empty() {
                return Err("Verification enabled without trusted gateways".to_string());
            }
            for url in &self.verification.trusted_gateways {
                check(url, "trusted gateway URL")?;
            }
            if self.verification.min_trusted_responses == 0 {
                return Err("Minimum trusted responses must be greater than 0".to_string());
            }
            if self.verification.min_trusted_responses > self.verification.trusted_gateways.len() {
                return Err(format!(
                    "Minimum trusted responses ({}) exceeds the number of trusted gateways ({})",
                    self.verification.min_trusted_responses,
                    self.verification.trusted_gateways.len()
                ));
            }
            if self.verification.timeout_ms == 0 {
                return Err("Verification timeout must be greater than 0".to_string());
            }
        }

        if self.http.concurrent_limit == 0 {
            return Err("HTTP concurrency limit must be greater than 0".to_string());
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = WayfinderConfig::default();
        assert_eq!(config.routing.strategy, RoutingStrategyKind::FastestPing);
        assert_eq!(config.routing.ping_timeout(), Duration::from_millis(500));
        assert_eq!(config.verification.min_trusted_responses, 2);
        assert!(!config.verification.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = WayfinderConfig::default();
        config.gateways.urls = vec!["ftp://bad".to_string()];
        assert!(config.validate().is_err());

        let mut config = WayfinderConfig::default();
        config.routing.strategy = RoutingStrategyKind::Preferred;
        assert!(config.validate().is_err());
        config.routing.preferred_gateway = Some("https://ar-io.dev".to_string());
        assert!(config.validate().is_ok());

        let mut config = WayfinderConfig::default();
        config.verification.enabled = true;
        assert!(config.validate().unwrap_err().contains("exceeds"));
        config.verification.min_trusted_responses = 1;
        assert!(config.validate().is_ok());

        let mut config = WayfinderConfig::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_content = r#"
[gateways]
urls = ["https://arweave.net", "https://ar-io.dev"]
cache_ttl_seconds = 0

[routing]
strategy = "priority"
sort_by = "totalDelegatedStake"
sort_order = "asc"
limit = 3

[verification]
enabled = true
strategies = ["hash", "data-root"]
trusted_gateways = ["https://arweave.net", "https://permagate.io"]
strict = true
"#;

        let config: WayfinderConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.gateways.urls.len(), 2);
        assert_eq!(config.routing.strategy, RoutingStrategyKind::Priority);
        assert_eq!(config.routing.sort_by, SortBy::TotalDelegatedStake);
        assert_eq!(config.routing.sort_order, SortOrder::Asc);
        assert_eq!(
            config.verification.strategies,
            vec![VerificationStrategyKind::Hash, VerificationStrategyKind::DataRoot]
        );
        assert!(config.verification.strict);
        assert_eq!(config.http, HttpConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = WayfinderConfig::from_file("does/not/exist.toml").unwrap();
        assert_eq!(config.gateways, GatewaysConfig::default());
    }
}
