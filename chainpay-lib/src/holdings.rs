//! Payer holdings.
//!
//! Balances are supplied by an external indexer; this crate only reads
//! them through [`HoldingsProvider`].

use crate::amount::TokenAmount;
use crate::assets::{Asset, AssetId};
use crate::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Read-only view of payer balances.
pub trait HoldingsProvider: Send + Sync {
    /// Available balance of `asset` held by `payer`, or `None` if unknown.
    fn balance_of(&self, payer: &Address, asset: &Asset) -> Option<TokenAmount>;
}

/// One balance entry, as loaded from JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingEntry {
    /// Holder address.
    pub owner: Address,
    /// Asset held.
    pub asset: AssetId,
    /// Balance in minimal units.
    pub balance: TokenAmount,
}

/// In-memory balance table.
///
/// # Example
///
/// ```
/// use chainpay_lib::amount::TokenAmount;
/// use chainpay_lib::assets::Asset;
/// use chainpay_lib::holdings::{HoldingsProvider, HoldingsSnapshot};
/// use chainpay_lib::{Address, NetworkId};
///
/// let payer = Address::new("0x00000000000000000000000000000000000000aa").unwrap();
/// let eth = Asset::native(NetworkId::BASE, 18, "ETH");
///
/// let mut holdings = HoldingsSnapshot::new();
/// holdings.set_balance(&payer, &eth, TokenAmount::new(10));
/// assert_eq!(holdings.balance_of(&payer, &eth), Some(TokenAmount::new(10)));
/// ```
#[derive(Clone, Debug, Default)]
pub struct HoldingsSnapshot {
    balances: HashMap<(Address, AssetId), TokenAmount>,
}

impl HoldingsSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from a list of entries. Later entries win.
    pub fn from_entries(entries: impl IntoIterator<Item = HoldingEntry>) -> Self {
        let balances = entries
            .into_iter()
            .map(|entry| ((entry.owner, entry.asset), entry.balance))
            .collect();
        Self { balances }
    }

    /// Parse a JSON array of [`HoldingEntry`].
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let entries: Vec<HoldingEntry> = serde_json::from_str(json)?;
        Ok(Self::from_entries(entries))
    }

    /// Set or replace a balance.
    pub fn set_balance(&mut self, owner: &Address, asset: &Asset, balance: TokenAmount) {
        self.balances.insert((owner.clone(), asset.id()), balance);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    /// Returns true if no balances are known.
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

impl HoldingsProvider for HoldingsSnapshot {
    fn balance_of(&self, payer: &Address, asset: &Asset) -> Option<TokenAmount> {
        self.balances.get(&(payer.clone(), asset.id())).copied()
    }
}
