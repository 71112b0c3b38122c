//! Wallet capability boundary.
//!
//! The executor never talks to a wallet connector directly. Integrators
//! implement [`WalletCapability`] on top of whatever signer they use and
//! report failures as [`ProviderError`] values, which are plain data built
//! from whatever the provider returned.

mod mock;

pub use mock::{provider_errors, MockWallet, WalletCalls};

use crate::amount::TokenAmount;
use crate::payment::Transfer;
use crate::NetworkId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// RPC method used for network switch requests.
pub const SWITCH_CHAIN_METHOD: &str = "wallet_switchEthereumChain";
/// RPC method used when the wallet must first add the network.
pub const ADD_CHAIN_METHOD: &str = "wallet_addEthereumChain";
/// RPC method used for signing and broadcasting.
pub const SEND_TRANSACTION_METHOD: &str = "eth_sendTransaction";

/// Cause chains deeper than this are ignored.
pub const MAX_CAUSE_DEPTH: usize = 8;

/// Result of a wallet call.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// An error reported by a wallet, connector or RPC node.
///
/// Every field is optional; providers disagree on error shapes, and the
/// classifier only looks at what is present.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderError {
    /// Numeric code (EIP-1193 or JSON-RPC).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    /// Error class name, e.g. `UserRejectedRequestError`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Additional provider detail text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// RPC method the error came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Wrapped lower-level error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<ProviderError>>,
}

impl ProviderError {
    /// Create an error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Set the numeric code.
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    /// Set the error class name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the detail text.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Set the originating RPC method.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Record the RPC method unless the provider already reported one.
    pub fn with_method_if_absent(self, method: &str) -> Self {
        if self.chain().any(|e| e.method.is_some()) {
            self
        } else {
            self.with_method(method)
        }
    }

    /// Wrap a lower-level error.
    pub fn with_cause(mut self, cause: ProviderError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// This error followed by its causes, at most [`MAX_CAUSE_DEPTH`] deep.
    pub fn chain(&self) -> impl Iterator<Item = &ProviderError> {
        std::iter::successors(Some(self), |e| e.cause.as_deref()).take(MAX_CAUSE_DEPTH)
    }

    /// Build an error from arbitrary JSON.
    ///
    /// Never fails: strings become the message, numeric strings are
    /// accepted as codes, and `cause`, `error` or `data` objects become the
    /// cause. Unknown fields are ignored.
    pub fn from_json(value: &serde_json::Value) -> Self {
        Self::from_json_at_depth(value, 0)
    }

    /// Parse `text` as JSON, falling back to treating it as a message.
    pub fn from_json_str(text: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(value) => Self::from_json(&value),
            Err(_) => Self::new(text),
        }
    }

    fn from_json_at_depth(value: &serde_json::Value, depth: usize) -> Self {
        use serde_json::Value;

        let object = match value {
            Value::Object(object) => object,
            Value::String(message) => return Self::new(message.as_str()),
            Value::Null => return Self::default(),
            other => return Self::new(other.to_string()),
        };

        let text = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| object.get(*key))
                .find_map(|v| match v {
                    Value::String(s) if !s.is_empty() => Some(s.clone()),
                    _ => None,
                })
        };

        let code = object.get("code").and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });

        let cause = if depth + 1 < MAX_CAUSE_DEPTH {
            ["cause", "error", "data"]
                .iter()
                .filter_map(|key| object.get(*key))
                .find(|v| v.is_object())
                .map(|v| Box::new(Self::from_json_at_depth(v, depth + 1)))
        } else {
            None
        };

        Self {
            code,
            name: text(&["name"]),
            message: text(&["shortMessage", "message", "reason"]),
            details: text(&["details"]),
            method: text(&["method"]),
            cause,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{}: ", name)?;
        }
        match &self.message {
            Some(message) => write!(f, "{}", message)?,
            None => write!(f, "unknown provider error")?,
        }
        if let Some(code) = self.code {
            write!(f, " (code {})", code)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, ": {}", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

/// Handle of a broadcast transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHandle {
    /// Transaction hash.
    pub hash: String,
    /// Network it was broadcast on.
    pub network_id: NetworkId,
}

/// Confirmation receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Transaction hash.
    pub tx_hash: String,
    /// Block the transaction was included in.
    pub block_number: u64,
    /// Confirmations observed.
    pub confirmations: u64,
}

/// A transfer ready to be signed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedTransfer {
    /// The transfer to sign.
    pub transfer: Transfer,
    /// Estimated network fee in native units, when the wallet provides one.
    pub fee_estimate: Option<TokenAmount>,
}

impl PreparedTransfer {
    /// A prepared transfer without fee estimate.
    pub fn new(transfer: Transfer) -> Self {
        Self {
            transfer,
            fee_estimate: None,
        }
    }

    /// Attach a fee estimate.
    pub fn with_fee_estimate(mut self, fee: TokenAmount) -> Self {
        self.fee_estimate = Some(fee);
        self
    }
}

/// Signer capability consumed by the transfer executor.
///
/// Implement this trait to connect a wallet to the executor.
#[async_trait]
pub trait WalletCapability: Send + Sync {
    /// Network the signer is currently on, if known.
    fn active_network_id(&self) -> Option<NetworkId>;

    /// Whether [`switch_network`](Self::switch_network) can be attempted.
    fn supports_network_switch(&self) -> bool {
        true
    }

    /// Ask the signer to move to `network_id`.
    ///
    /// Returning `Ok` means the request was accepted; the executor polls
    /// [`active_network_id`](Self::active_network_id) until it takes effect.
    async fn switch_network(&self, network_id: NetworkId) -> ProviderResult<()>;

    /// Estimate fees and otherwise get `transfer` ready for signing.
    async fn prepare_transfer(&self, transfer: &Transfer) -> ProviderResult<PreparedTransfer> {
        Ok(PreparedTransfer::new(transfer.clone()))
    }

    /// Prompt for a signature and broadcast.
    async fn sign_and_send(&self, prepared: &PreparedTransfer) -> ProviderResult<TxHandle>;

    /// Resolve once `tx` has `required_confirmations`.
    async fn wait_for_confirmation(
        &self,
        tx: &TxHandle,
        required_confirmations: u64,
    ) -> ProviderResult<Receipt>;
}
