//! Assets and the token registry.
//!
//! An [`Asset`] is one concrete thing a payer can send: either an ERC-20
//! style token contract or a network's native currency. The
//! [`TokenRegistry`] answers which assets settle a given logical ticker
//! (e.g. every USD stablecoin for `"USD"`).

mod registry;

pub use registry::StaticTokenRegistry;

use crate::{Address, NetworkId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A concrete transferable asset on one network.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Asset {
    /// Fungible token contract.
    Token {
        /// Network the contract lives on.
        network_id: NetworkId,
        /// Token contract address.
        contract: Address,
        /// Token precision.
        decimals: u8,
        /// Token ticker, e.g. "USDC".
        ticker: String,
    },
    /// Native currency of a network (gas token).
    NativeCurrency {
        /// Network the currency belongs to.
        network_id: NetworkId,
        /// Currency precision.
        decimals: u8,
        /// Currency ticker, e.g. "ETH".
        ticker: String,
    },
}

impl Asset {
    /// Create a token asset.
    pub fn token(
        network_id: NetworkId,
        contract: Address,
        decimals: u8,
        ticker: impl Into<String>,
    ) -> Self {
        Self::Token {
            network_id,
            contract,
            decimals,
            ticker: ticker.into(),
        }
    }

    /// Create a native currency asset.
    pub fn native(network_id: NetworkId, decimals: u8, ticker: impl Into<String>) -> Self {
        Self::NativeCurrency {
            network_id,
            decimals,
            ticker: ticker.into(),
        }
    }

    /// Network the asset lives on.
    pub fn network_id(&self) -> NetworkId {
        match self {
            Self::Token { network_id, .. } | Self::NativeCurrency { network_id, .. } => {
                *network_id
            }
        }
    }

    /// Precision of the asset's minimal unit.
    pub fn decimals(&self) -> u8 {
        match self {
            Self::Token { decimals, .. } | Self::NativeCurrency { decimals, .. } => *decimals,
        }
    }

    /// Ticker of the asset.
    pub fn ticker(&self) -> &str {
        match self {
            Self::Token { ticker, .. } | Self::NativeCurrency { ticker, .. } => ticker,
        }
    }

    /// Contract address for tokens, `None` for native currencies.
    pub fn contract(&self) -> Option<&Address> {
        match self {
            Self::Token { contract, .. } => Some(contract),
            Self::NativeCurrency { .. } => None,
        }
    }

    /// Returns true for native currencies.
    pub fn is_native(&self) -> bool {
        matches!(self, Self::NativeCurrency { .. })
    }

    /// Network-scoped identity of this asset.
    pub fn id(&self) -> AssetId {
        match self {
            Self::Token {
                network_id,
                contract,
                ..
            } => AssetId::Token {
                network_id: *network_id,
                contract: contract.clone(),
            },
            Self::NativeCurrency { network_id, .. } => AssetId::Native {
                network_id: *network_id,
            },
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.ticker(), self.network_id())
    }
}

/// Identity of an asset, independent of its metadata.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssetId {
    /// Token contract on a network.
    Token {
        /// Network id.
        network_id: NetworkId,
        /// Contract address.
        contract: Address,
    },
    /// Native currency of a network.
    Native {
        /// Network id.
        network_id: NetworkId,
    },
}

impl AssetId {
    /// Network the identified asset lives on.
    pub fn network_id(&self) -> NetworkId {
        match self {
            Self::Token { network_id, .. } | Self::Native { network_id } => *network_id,
        }
    }
}

/// Source of the assets able to settle a logical ticker.
///
/// Consumed read-only by the strategy generator.
pub trait TokenRegistry: Send + Sync {
    /// All assets associated with a logical asset ticker (case-insensitive).
    fn assets_for(&self, logical_ticker: &str) -> Vec<Asset>;
}
