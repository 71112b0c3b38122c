//! Configuration types for the strategy engine and transfer executor.
//!
//! Every field has a default, so a config file only needs the values it
//! overrides:
//!
//! ```
//! use chainpay_lib::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{"executor": {"required_confirmations": 3}}"#).unwrap();
//! assert_eq!(config.executor.required_confirmations, 3);
//! assert_eq!(config.executor.switch_poll_attempts, 20);
//! ```

use crate::{ChainpayError, NetworkId, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the transfer executor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Confirmations to wait for before reporting success.
    #[serde(default = "default_required_confirmations")]
    pub required_confirmations: u64,

    /// Polls of the wallet's active network after a switch request.
    #[serde(default = "default_switch_poll_attempts")]
    pub switch_poll_attempts: u32,

    /// Delay between switch polls in milliseconds.
    #[serde(default = "default_switch_poll_interval_ms")]
    pub switch_poll_interval_ms: u64,

    /// Automatic retries after a retryable provider error, per explicit reset.
    #[serde(default = "default_max_automatic_retries")]
    pub max_automatic_retries: u32,
}

fn default_required_confirmations() -> u64 {
    1
}

fn default_switch_poll_attempts() -> u32 {
    20
}

fn default_switch_poll_interval_ms() -> u64 {
    250
}

fn default_max_automatic_retries() -> u32 {
    1
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            required_confirmations: default_required_confirmations(),
            switch_poll_attempts: default_switch_poll_attempts(),
            switch_poll_interval_ms: default_switch_poll_interval_ms(),
            max_automatic_retries: default_max_automatic_retries(),
        }
    }
}

impl ExecutorConfig {
    /// Set the number of required confirmations.
    pub fn with_required_confirmations(mut self, confirmations: u64) -> Self {
        self.required_confirmations = confirmations;
        self
    }

    /// Set the network switch polling budget.
    pub fn with_switch_polling(mut self, attempts: u32, interval_ms: u64) -> Self {
        self.switch_poll_attempts = attempts;
        self.switch_poll_interval_ms = interval_ms;
        self
    }

    /// Set the automatic retry bound.
    pub fn with_max_automatic_retries(mut self, retries: u32) -> Self {
        self.max_automatic_retries = retries;
        self
    }

    /// Delay between switch polls.
    pub fn switch_poll_interval(&self) -> Duration {
        Duration::from_millis(self.switch_poll_interval_ms)
    }

    /// Check the values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.required_confirmations == 0 {
            return Err(ChainpayError::Config(
                "required_confirmations must be at least 1".into(),
            ));
        }
        if self.switch_poll_attempts == 0 {
            return Err(ChainpayError::Config(
                "switch_poll_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Static priority tables used to order strategies.
///
/// Earlier entries rank higher; anything unlisted ranks last.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityTable {
    /// Networks in descending priority.
    #[serde(default = "default_network_priority")]
    pub networks: Vec<NetworkId>,

    /// Asset tickers in descending priority (case-insensitive).
    #[serde(default = "default_asset_priority")]
    pub assets: Vec<String>,
}

fn default_network_priority() -> Vec<NetworkId> {
    vec![
        NetworkId::BASE,
        NetworkId::OPTIMISM,
        NetworkId::ARBITRUM,
        NetworkId::POLYGON,
        NetworkId::ETHEREUM,
    ]
}

fn default_asset_priority() -> Vec<String> {
    ["USDC", "USDT", "DAI", "ETH", "POL"]
        .iter()
        .map(|t| t.to_string())
        .collect()
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self {
            networks: default_network_priority(),
            assets: default_asset_priority(),
        }
    }
}

impl PriorityTable {
    /// Create a table from explicit orderings.
    pub fn new(networks: Vec<NetworkId>, assets: Vec<String>) -> Self {
        Self { networks, assets }
    }

    /// Rank of a network (lower is better); `None` when unlisted.
    pub fn network_rank(&self, network_id: NetworkId) -> Option<usize> {
        self.networks.iter().position(|n| *n == network_id)
    }

    /// Rank of an asset ticker (lower is better); `None` when unlisted.
    pub fn asset_rank(&self, ticker: &str) -> Option<usize> {
        self.assets.iter().position(|t| t.eq_ignore_ascii_case(ticker))
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Strategy ordering.
    #[serde(default)]
    pub priorities: PriorityTable,

    /// Executor behaviour.
    #[serde(default)]
    pub executor: ExecutorConfig,
}

impl EngineConfig {
    /// Parse from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ChainpayError::Config(e.to_string()))?;
        config.executor.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json).map_err(|err| match err {
            ChainpayError::Config(msg) => ChainpayError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executor_defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.required_confirmations, 1);
        assert_eq!(config.switch_poll_attempts, 20);
        assert_eq!(config.switch_poll_interval(), Duration::from_millis(250));
        assert_eq!(config.max_automatic_retries, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = ExecutorConfig::default()
            .with_required_confirmations(6)
            .with_switch_polling(5, 10)
            .with_max_automatic_retries(0);
        assert_eq!(config.required_confirmations, 6);
        assert_eq!(config.switch_poll_attempts, 5);
        assert_eq!(config.switch_poll_interval_ms, 10);
        assert_eq!(config.max_automatic_retries, 0);
    }

    #[test]
    fn test_validate_rejects_zero() {
        assert!(ExecutorConfig::default()
            .with_required_confirmations(0)
            .validate()
            .is_err());
        assert!(EngineConfig::from_json_str(r#"{"executor": {"switch_poll_attempts": 0}}"#).is_err());
    }

    #[test]
    fn test_priority_ranks() {
        let table = PriorityTable::default();
        assert_eq!(table.network_rank(NetworkId::BASE), Some(0));
        assert_eq!(table.network_rank(NetworkId(999)), None);
        assert_eq!(table.asset_rank("usdc"), Some(0));
        assert_eq!(table.asset_rank("WBTC"), None);
    }

    #[test]
    fn test_partial_json() {
        let config =
            EngineConfig::from_json_str(r#"{"priorities": {"networks": [1, 137]}}"#).unwrap();
        assert_eq!(
            config.priorities.networks,
            vec![NetworkId::ETHEREUM, NetworkId::POLYGON]
        );
        assert_eq!(config.priorities.assets, default_asset_priority());
        assert_eq!(config.executor, ExecutorConfig::default());
        assert!(EngineConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load("/nonexistent/chainpay.json").unwrap_err();
        assert_eq!(err.code(), crate::ChainpayErrorCode::Io);
    }
}
