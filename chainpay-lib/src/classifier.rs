//! Provider error classification.
//!
//! [`classify`] is the only place that looks at raw provider error shapes.
//! Everything downstream matches on [`ErrorKind`].
//!
//! Matching is heuristic: codes first, then the originating RPC method,
//! then lowercase substring search over names, messages and details of the
//! whole cause chain. Anything unrecognised is [`ErrorKind::Fatal`].

use crate::wallet::{ProviderError, ADD_CHAIN_METHOD, SWITCH_CHAIN_METHOD};
use serde::{Deserialize, Serialize};
use std::fmt;

/// EIP-1193: user rejected the request.
const CODE_USER_REJECTED: i64 = 4001;
/// JSON-RPC: resource unavailable, typically a prompt already open.
const CODE_REQUEST_PENDING: i64 = -32002;

const REJECTION_PATTERNS: &[&str] = &[
    "user rejected",
    "user denied",
    "rejected by user",
    "user cancelled",
    "userrejectedrequesterror",
];

const PENDING_PATTERNS: &[&str] = &["already pending", "request already in progress"];

const CHAIN_MISMATCH_PATTERNS: &[&str] = &[
    "chainmismatcherror",
    "chain mismatch",
    "does not match the target chain",
];

const FEE_UNAFFORDABLE_PATTERNS: &[&str] = &[
    "insufficient funds for gas",
    "insufficient funds for intrinsic transaction cost",
    "gas required exceeds allowance",
];

const EPHEMERAL_PATTERNS: &[&str] = &[
    "connectornotconnectederror",
    "connector not connected",
    "connector is not connected",
];

const RETRYABLE_PATTERNS: &[&str] = &[
    "nonce too low",
    "nonce has already been used",
    "replacement transaction underpriced",
    "transaction underpriced",
    "fee too low",
    "less than block base fee",
    "max fee per gas less than",
];

/// Closed taxonomy of provider failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// User declined adding the network to the wallet.
    UserRejectedNetworkAdd,
    /// User declined switching networks.
    UserRejectedNetworkSwitch,
    /// User declined signing.
    UserRejectedTransaction,
    /// A previous switch prompt is still open.
    NetworkSwitchNonFatal,
    /// Signer is on a different network than required.
    ChainMismatch,
    /// Local connector race; retry immediately.
    EphemeralPrepareError,
    /// Stale provider state such as fee or nonce; retry after a reset.
    RetryableProviderError,
    /// Native balance cannot cover the network fee.
    FeeUnaffordable,
    /// Anything else.
    Fatal,
}

impl ErrorKind {
    /// Returns true for the three user rejection kinds.
    pub fn is_user_rejection(&self) -> bool {
        matches!(
            self,
            Self::UserRejectedNetworkAdd
                | Self::UserRejectedNetworkSwitch
                | Self::UserRejectedTransaction
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UserRejectedNetworkAdd => "user rejected adding the network",
            Self::UserRejectedNetworkSwitch => "user rejected the network switch",
            Self::UserRejectedTransaction => "user rejected the transaction",
            Self::NetworkSwitchNonFatal => "network switch already pending",
            Self::ChainMismatch => "wallet is on the wrong network",
            Self::EphemeralPrepareError => "wallet connector not ready",
            Self::RetryableProviderError => "provider state is stale",
            Self::FeeUnaffordable => "insufficient native balance for network fee",
            Self::Fatal => "unrecoverable provider error",
        };
        write!(f, "{}", s)
    }
}

/// Lowercased text fields of the whole cause chain.
fn haystack(error: &ProviderError) -> String {
    let mut text = String::new();
    for e in error.chain() {
        for field in [&e.name, &e.message, &e.details].into_iter().flatten() {
            text.push_str(&field.to_lowercase());
            text.push('\n');
        }
    }
    text
}

fn contains_any(text: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| text.contains(p))
}

fn has_code(error: &ProviderError, code: i64) -> bool {
    error.chain().any(|e| e.code == Some(code))
}

fn rejection_kind(error: &ProviderError, text: &str) -> ErrorKind {
    let method = error.chain().find_map(|e| e.method.as_deref());
    match method {
        Some(ADD_CHAIN_METHOD) => ErrorKind::UserRejectedNetworkAdd,
        Some(SWITCH_CHAIN_METHOD) => ErrorKind::UserRejectedNetworkSwitch,
        Some(_) => ErrorKind::UserRejectedTransaction,
        None if text.contains("addethereumchain") || text.contains("add network") => {
            ErrorKind::UserRejectedNetworkAdd
        }
        None if text.contains("switchethereumchain") || text.contains("switch network") => {
            ErrorKind::UserRejectedNetworkSwitch
        }
        None => ErrorKind::UserRejectedTransaction,
    }
}

/// Map a provider error onto [`ErrorKind`].
///
/// # Example
///
/// ```
/// use chainpay_lib::classifier::{classify, ErrorKind};
/// use chainpay_lib::wallet::ProviderError;
///
/// let err = ProviderError::new("User rejected the request.")
///     .with_code(4001)
///     .with_method("wallet_switchEthereumChain");
/// assert_eq!(classify(&err), ErrorKind::UserRejectedNetworkSwitch);
/// assert_eq!(classify(&ProviderError::default()), ErrorKind::Fatal);
/// ```
pub fn classify(error: &ProviderError) -> ErrorKind {
    let text = haystack(error);

    let kind = if has_code(error, CODE_USER_REJECTED) || contains_any(&text, REJECTION_PATTERNS) {
        rejection_kind(error, &text)
    } else if has_code(error, CODE_REQUEST_PENDING) || contains_any(&text, PENDING_PATTERNS) {
        ErrorKind::NetworkSwitchNonFatal
    } else if contains_any(&text, CHAIN_MISMATCH_PATTERNS) {
        ErrorKind::ChainMismatch
    } else if contains_any(&text, FEE_UNAFFORDABLE_PATTERNS) {
        ErrorKind::FeeUnaffordable
    } else if contains_any(&text, EPHEMERAL_PATTERNS) {
        ErrorKind::EphemeralPrepareError
    } else if contains_any(&text, RETRYABLE_PATTERNS) {
        ErrorKind::RetryableProviderError
    } else {
        ErrorKind::Fatal
    };

    tracing::trace!(error = %error, ?kind, "classified provider error");
    kind
}
