// 7.0 config.rs: knobs for the composition layer. query limits, ledger view, price freshness.
// the calculators themselves take no config: market parameters come from MarketConfigEntity.

use serde::{Deserialize, Serialize};

/// Page size used when a filter leaves `limit` unset.
pub const DEFAULT_QUERY_LIMIT: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    // limit applied when a caller does not pass one
    pub default_limit: u32,
    // hard cap on any requested limit
    pub max_limit: u32,
    // account and asset position lookups return only latest revisions
    pub positions_latest_only: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_QUERY_LIMIT,
            max_limit: 1_000,
            positions_latest_only: true,
        }
    }
}

impl QueryConfig {
    /// Requested limit, defaulted and capped.
    pub fn resolve_limit(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }
}

/** 7.1: oracle freshness. older prices are still used, but flagged and logged */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceConfig {
    pub max_price_age_secs: i64,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            max_price_age_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    pub environment: Environment,
    pub query: QueryConfig,
    pub prices: PriceConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            query: QueryConfig::default(),
            prices: PriceConfig::default(),
        }
    }
}

impl CoreConfig {
    pub fn testnet() -> Self {
        let mut config = Self::default();
        config.environment = Environment::Testnet;
        config.prices.max_price_age_secs = 120; // slower testnet oracles
        config
    }

    pub fn mainnet() -> Self {
        let mut config = Self::default();
        config.environment = Environment::Mainnet;
        config.query.max_limit = 500;
        config.prices.max_price_age_secs = 30;
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query.default_limit == 0 {
            return Err(ConfigError::InvalidQuery {
                reason: "Default limit must be positive".to_string(),
            });
        }
        if self.query.default_limit > self.query.max_limit {
            return Err(ConfigError::InvalidQuery {
                reason: "Default limit exceeds max limit".to_string(),
            });
        }
        if self.prices.max_price_age_secs <= 0 {
            return Err(ConfigError::InvalidPrices {
                reason: "Max price age must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid query config: {reason}")]
    InvalidQuery { reason: String },
    #[error("Invalid price config: {reason}")]
    InvalidPrices { reason: String },
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn config(&self) -> CoreConfig {
        match self {
            Environment::Development => CoreConfig::default(),
            Environment::Testnet => CoreConfig::testnet(),
            Environment::Mainnet => CoreConfig::mainnet(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = CoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.query.default_limit, 100);
        assert!(config.query.positions_latest_only);
    }

    #[test]
    fn test_environment_presets() {
        assert!(Environment::Development.config().validate().is_ok());
        assert!(Environment::Testnet.config().validate().is_ok());
        assert!(Environment::Mainnet.config().validate().is_ok());
        assert_eq!(Environment::Mainnet.config().environment, Environment::Mainnet);
    }

    #[test]
    fn test_resolve_limit() {
        let query = QueryConfig::default();
        assert_eq!(query.resolve_limit(None), 100);
        assert_eq!(query.resolve_limit(Some(10)), 10);
        assert_eq!(query.resolve_limit(Some(50_000)), 1_000);
    }

    #[test]
    fn test_invalid_limits() {
        let mut config = CoreConfig::default();
        config.query.default_limit = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidQuery { .. })));

        let mut config = CoreConfig::default();
        config.query.default_limit = 2_000;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidQuery { .. })));
    }

    #[test]
    fn test_invalid_price_age() {
        let mut config = CoreConfig::default();
        config.prices.max_price_age_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPrices { .. })));
    }

    #[test]
    fn test_config_serialization() {
        let config = CoreConfig::testnet();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"testnet\""));
        let back: CoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
