//! In-memory token registry.
//!
//! # Thread Safety
//!
//! The registry uses `RwLock` for interior mutability. A poisoned lock is
//! recovered rather than propagated: the map only ever holds fully
//! inserted entries.

use super::{Asset, TokenRegistry};
use crate::{Address, NetworkId};
use std::collections::HashMap;
use std::sync::RwLock;

/// Logical ticker for USD-denominated payments.
pub const USD: &str = "USD";
/// Logical ticker for ether-denominated payments.
pub const ETH: &str = "ETH";

// (network, contract, decimals, ticker)
const USD_TOKENS: &[(NetworkId, &str, u8, &str)] = &[
    (
        NetworkId::ETHEREUM,
        "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
        6,
        "USDC",
    ),
    (
        NetworkId::BASE,
        "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
        6,
        "USDC",
    ),
    (
        NetworkId::ARBITRUM,
        "0xaf88d065e77c8cC2239327C5EDb3A432268e5831",
        6,
        "USDC",
    ),
    (
        NetworkId::OPTIMISM,
        "0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85",
        6,
        "USDC",
    ),
    (
        NetworkId::POLYGON,
        "0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359",
        6,
        "USDC",
    ),
    (
        NetworkId::ETHEREUM,
        "0xdAC17F958D2ee523a2206206994597C13D831ec7",
        6,
        "USDT",
    ),
    (
        NetworkId::ARBITRUM,
        "0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9",
        6,
        "USDT",
    ),
    (
        NetworkId::POLYGON,
        "0xc2132D05D31c914a87C6611C10748AEb04B58e8F",
        6,
        "USDT",
    ),
    (
        NetworkId::ETHEREUM,
        "0x6B175474E89094C44Da98b954EedeAC495271d0F",
        18,
        "DAI",
    ),
];

const ETH_NETWORKS: &[NetworkId] = &[
    NetworkId::ETHEREUM,
    NetworkId::BASE,
    NetworkId::ARBITRUM,
    NetworkId::OPTIMISM,
];

/// Registry of assets per logical ticker.
///
/// # Example
///
/// ```
/// use chainpay_lib::assets::{Asset, StaticTokenRegistry, TokenRegistry};
/// use chainpay_lib::NetworkId;
///
/// let registry = StaticTokenRegistry::new();
/// registry.register("EUR", Asset::native(NetworkId(100), 18, "xDAI"));
/// assert_eq!(registry.assets_for("eur").len(), 1);
/// ```
pub struct StaticTokenRegistry {
    assets: RwLock<HashMap<String, Vec<Asset>>>,
}

impl StaticTokenRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            assets: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a registry with the built-in USD stablecoin and ETH tables.
    pub fn with_defaults() -> Self {
        let registry = Self::new();

        for (network_id, contract, decimals, ticker) in USD_TOKENS {
            // Constant table; every entry is a valid address.
            if let Ok(contract) = Address::new(contract) {
                registry.register(USD, Asset::token(*network_id, contract, *decimals, *ticker));
            }
        }
        for network_id in ETH_NETWORKS {
            registry.register(ETH, Asset::native(*network_id, 18, "ETH"));
        }

        registry
    }

    /// Associates an asset with a logical ticker.
    ///
    /// Registering the same asset identity twice replaces the earlier entry.
    pub fn register(&self, logical_ticker: &str, asset: Asset) {
        let mut assets = self.assets.write().unwrap_or_else(|e| e.into_inner());
        let entry = assets.entry(logical_ticker.to_ascii_uppercase()).or_default();
        let id = asset.id();
        entry.retain(|existing| existing.id() != id);
        entry.push(asset);
    }

    /// Removes every asset on `network_id` for a logical ticker.
    ///
    /// Returns the number of removed assets.
    pub fn unregister_network(&self, logical_ticker: &str, network_id: NetworkId) -> usize {
        let mut assets = self.assets.write().unwrap_or_else(|e| e.into_inner());
        match assets.get_mut(&logical_ticker.to_ascii_uppercase()) {
            Some(entry) => {
                let before = entry.len();
                entry.retain(|asset| asset.network_id() != network_id);
                before - entry.len()
            }
            None => 0,
        }
    }

    /// Returns all registered logical tickers.
    pub fn list_tickers(&self) -> Vec<String> {
        let assets = self.assets.read().unwrap_or_else(|e| e.into_inner());
        let mut tickers: Vec<String> = assets.keys().cloned().collect();
        tickers.sort();
        tickers
    }

    /// Returns the number of registered assets across all tickers.
    pub fn len(&self) -> usize {
        let assets = self.assets.read().unwrap_or_else(|e| e.into_inner());
        assets.values().map(Vec::len).sum()
    }

    /// Returns true if no assets are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TokenRegistry for StaticTokenRegistry {
    fn assets_for(&self, logical_ticker: &str) -> Vec<Asset> {
        let assets = self.assets.read().unwrap_or_else(|e| e.into_inner());
        assets
            .get(&logical_ticker.to_ascii_uppercase())
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for StaticTokenRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for StaticTokenRegistry {
    fn clone(&self) -> Self {
        let assets = self.assets.read().unwrap_or_else(|e| e.into_inner());
        Self {
            assets: RwLock::new(assets.clone()),
        }
    }
}
