//! Payer preferences for strategy generation.

use crate::assets::Asset;
use crate::NetworkId;
use serde::{Deserialize, Serialize};

/// Exclusion filters applied while generating strategies.
///
/// `None` means "no restriction". Tickers compare case-insensitively.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyPreferences {
    /// Asset tickers never to pay with.
    #[serde(default)]
    pub excluded_tickers: Option<Vec<String>>,
    /// Networks never to pay on.
    #[serde(default)]
    pub excluded_networks: Option<Vec<NetworkId>>,
}

impl StrategyPreferences {
    /// Preferences with no restrictions.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Add a ticker to the exclusion list.
    pub fn exclude_ticker(mut self, ticker: impl Into<String>) -> Self {
        let ticker = ticker.into();
        if !self.is_ticker_excluded(&ticker) {
            self.excluded_tickers.get_or_insert_with(Vec::new).push(ticker);
        }
        self
    }

    /// Add a network to the exclusion list.
    pub fn exclude_network(mut self, network_id: NetworkId) -> Self {
        if !self.is_network_excluded(network_id) {
            self.excluded_networks
                .get_or_insert_with(Vec::new)
                .push(network_id);
        }
        self
    }

    /// Check if a ticker is excluded.
    pub fn is_ticker_excluded(&self, ticker: &str) -> bool {
        self.excluded_tickers
            .as_deref()
            .is_some_and(|tickers| tickers.iter().any(|t| t.eq_ignore_ascii_case(ticker)))
    }

    /// Check if a network is excluded.
    pub fn is_network_excluded(&self, network_id: NetworkId) -> bool {
        self.excluded_networks
            .as_deref()
            .is_some_and(|networks| networks.contains(&network_id))
    }

    /// An asset is excluded when either its ticker or its network is.
    pub fn excludes(&self, asset: &Asset) -> bool {
        self.is_ticker_excluded(asset.ticker()) || self.is_network_excluded(asset.network_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_excludes_nothing() {
        let prefs = StrategyPreferences::unrestricted();
        assert!(prefs.excluded_tickers.is_none());
        assert!(!prefs.excludes(&Asset::native(NetworkId::BASE, 18, "ETH")));
    }

    #[test]
    fn test_ticker_exclusion_is_case_insensitive() {
        let prefs = StrategyPreferences::default().exclude_ticker("usdt");
        assert!(prefs.is_ticker_excluded("USDT"));
        assert!(!prefs.is_ticker_excluded("USDC"));
    }

    #[test]
    fn test_either_exclusion_is_sufficient() {
        let prefs = StrategyPreferences::default()
            .exclude_ticker("DAI")
            .exclude_network(NetworkId::POLYGON);
        assert!(prefs.excludes(&Asset::native(NetworkId::POLYGON, 18, "POL")));
        assert!(prefs.excludes(&Asset::native(NetworkId::ETHEREUM, 18, "DAI")));
        assert!(!prefs.excludes(&Asset::native(NetworkId::ETHEREUM, 18, "ETH")));
    }

    #[test]
    fn test_exclusions_deduplicate() {
        let prefs = StrategyPreferences::default()
            .exclude_network(NetworkId::BASE)
            .exclude_network(NetworkId::BASE)
            .exclude_ticker("ETH")
            .exclude_ticker("eth");
        assert_eq!(prefs.excluded_networks.as_ref().map(Vec::len), Some(1));
        assert_eq!(prefs.excluded_tickers.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_deserialize_missing_fields() {
        let prefs: StrategyPreferences = serde_json::from_str("{}").unwrap();
        assert_eq!(prefs, StrategyPreferences::default());
    }
}
