//! Payment, transfer and strategy types.

use crate::amount::{LogicalAmount, TokenAmount};
use crate::assets::{Asset, AssetId};
use crate::{Address, ChainpayError, NetworkId, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A payment expressed in an abstract asset ("5 USD").
///
/// Immutable once constructed; [`with_sender`](Self::with_sender) consumes
/// the value and returns a new one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalPayment {
    sender: Option<Address>,
    receiver: Address,
    ticker: String,
    amount: LogicalAmount,
}

impl LogicalPayment {
    /// Create a payment whose sender is not yet resolved.
    pub fn new(receiver: Address, ticker: impl Into<String>, amount: LogicalAmount) -> Self {
        Self {
            sender: None,
            receiver,
            ticker: ticker.into(),
            amount,
        }
    }

    /// Resolve the paying address.
    pub fn with_sender(self, sender: Address) -> Self {
        Self {
            sender: Some(sender),
            ..self
        }
    }

    /// Paying address, if known.
    pub fn sender(&self) -> Option<&Address> {
        self.sender.as_ref()
    }

    /// Receiving address.
    pub fn receiver(&self) -> &Address {
        &self.receiver
    }

    /// Logical asset ticker.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Amount in canonical 18-decimal units.
    pub fn amount(&self) -> LogicalAmount {
        self.amount
    }
}

impl fmt::Display for LogicalPayment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} to {}", self.amount, self.ticker, self.receiver)
    }
}

/// One concrete on-chain transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Receiving address.
    pub to_address: Address,
    /// Paying address; `None` for proposed transfers.
    pub from_address: Option<Address>,
    /// Asset to send.
    pub asset: Asset,
    /// Amount in the asset's minimal units.
    pub amount: TokenAmount,
}

impl Transfer {
    /// Network the transfer must be signed on.
    pub fn network_id(&self) -> NetworkId {
        self.asset.network_id()
    }

    /// Paying address, or [`ChainpayError::MissingSender`].
    pub fn require_sender(&self) -> Result<&Address> {
        self.from_address.as_ref().ok_or(ChainpayError::MissingSender)
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} on {} to {}",
            self.amount.format_units(self.asset.decimals()),
            self.asset.ticker(),
            self.asset.network_id(),
            self.to_address
        )
    }
}

/// Whether a strategy's affordability was checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyMode {
    /// Generated without holdings; illustrative only.
    Proposed,
    /// Generated with holdings; the payer can afford it.
    Affordable,
}

/// A logical payment settled by exactly one concrete transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    /// The payment being settled.
    pub payment: LogicalPayment,
    /// The transfer that settles it.
    pub transfer: Transfer,
    /// Proposed or affordable.
    pub mode: StrategyMode,
}

impl Strategy {
    /// Key matching this strategy across regenerated candidate lists.
    pub fn selection_key(&self) -> SelectionKey {
        SelectionKey(self.transfer.asset.id())
    }

    /// Network of the transfer.
    pub fn network_id(&self) -> NetworkId {
        self.transfer.network_id()
    }

    /// Returns true when generated without holdings.
    pub fn is_proposed(&self) -> bool {
        self.mode == StrategyMode::Proposed
    }
}

/// Asset-and-network identity of a strategy.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionKey(pub AssetId);

impl SelectionKey {
    /// Returns true if `strategy` has this key.
    pub fn matches(&self, strategy: &Strategy) -> bool {
        self.0 == strategy.transfer.asset.id()
    }
}
