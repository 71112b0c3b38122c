//! Chainpay library.
//!
//! Settles a logical payment ("5 USD") with one concrete on-chain transfer
//! chosen from every token or native currency the payer could use. The
//! crate keeps no global state: registries, wallets and configuration are
//! handed in by the caller through [`EngineContext`].
//!
//! # Features
//!
//! - **Strategy Engine**: generate, filter, prioritize and select transfer
//!   candidates ([`strategy`])
//! - **Transfer Executor**: drive one transfer through network switching,
//!   signing and confirmation ([`executor`])
//! - **Error Classifier**: map opaque wallet errors onto a closed taxonomy
//!   ([`classifier`])
//!
//! # Example
//!
//! ```ignore
//! use chainpay_lib::prelude::*;
//!
//! let context = EngineContext::new(wallet).with_registry(Arc::new(StaticTokenRegistry::with_defaults()));
//! let payment = LogicalPayment::new(receiver, "USD", LogicalAmount::parse("5")?).with_sender(payer);
//! let mut selector = StrategySelector::new();
//! selector.set_candidates(context.strategy_engine().strategies(&payment, &prefs, Some(&holdings)));
//!
//! let executor = context.executor_for(selector.best().unwrap())?;
//! executor.execute().await;
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod amount;
pub mod assets;
pub mod classifier;
pub mod config;
pub mod context;
pub mod errors;
pub mod executor;
pub mod holdings;
pub mod payment;
pub mod prelude;
pub mod strategy;
pub mod wallet;

pub use context::EngineContext;
pub use errors::{ChainpayError, ChainpayErrorCode, ResetRefusal};

/// Common result alias for Chainpay operations.
pub type Result<T> = std::result::Result<T, ChainpayError>;

/// Numeric chain identifier (EIP-155 chain id).
///
/// # Example
///
/// ```
/// use chainpay_lib::NetworkId;
///
/// let base = NetworkId::BASE;
/// assert_eq!(base.as_u64(), 8453);
/// assert_eq!(base.to_string(), "8453");
/// ```
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NetworkId(pub u64);

impl NetworkId {
    /// Ethereum mainnet.
    pub const ETHEREUM: Self = Self(1);
    /// Optimism.
    pub const OPTIMISM: Self = Self(10);
    /// Polygon PoS.
    pub const POLYGON: Self = Self(137);
    /// Base.
    pub const BASE: Self = Self(8453);
    /// Arbitrum One.
    pub const ARBITRUM: Self = Self(42161);

    /// Get the raw chain id.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for NetworkId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 20-byte account or contract address, stored as lowercase `0x` hex.
///
/// # Example
///
/// ```
/// use chainpay_lib::Address;
///
/// let addr = Address::new("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913").unwrap();
/// assert_eq!(addr.as_str(), "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913");
/// assert!(Address::new("0x1234").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Validate and normalise an address.
    pub fn new(value: impl AsRef<str>) -> Result<Self> {
        let value = value.as_ref().trim();
        let digits = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .ok_or_else(|| ChainpayError::InvalidAddress(format!("{value}: missing 0x prefix")))?;
        let bytes = hex::decode(digits)
            .map_err(|e| ChainpayError::InvalidAddress(format!("{value}: {e}")))?;
        if bytes.len() != 20 {
            return Err(ChainpayError::InvalidAddress(format!(
                "{value}: expected 20 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(format!("0x{}", hex::encode(bytes))))
    }

    /// Get the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = ChainpayError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_normalises_case() {
        let upper = Address::new("0xA0B86991C6218B36C1D19D4A2E9EB0CE3606EB48").unwrap();
        let lower = Address::new("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48").unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_address_rejects_garbage() {
        assert!(Address::new("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48").is_err());
        assert!(Address::new("0xzz").is_err());
        assert!(Address::new("").is_err());
    }

    #[test]
    fn test_address_serde() {
        let addr: Address =
            serde_json::from_str("\"0x0000000000000000000000000000000000000001\"").unwrap();
        assert_eq!(
            serde_json::to_string(&addr).unwrap(),
            "\"0x0000000000000000000000000000000000000001\""
        );
        assert!(serde_json::from_str::<Address>("\"0x01\"").is_err());
    }

    #[test]
    fn test_network_id_display() {
        assert_eq!(NetworkId::ARBITRUM.to_string(), "42161");
        assert_eq!(NetworkId::from(10), NetworkId::OPTIMISM);
    }
}
