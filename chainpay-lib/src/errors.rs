//! Error types for Chainpay operations.
//!
//! These are the errors returned by the library API itself. Failures
//! reported by wallet providers are not represented here: they travel as
//! [`ProviderError`](crate::wallet::ProviderError) values and are mapped
//! through [`classify`](crate::classifier::classify) into execution status.

use thiserror::Error;

/// Stable numeric error codes, useful for FFI and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ChainpayErrorCode {
    /// Invalid amount value
    InvalidAmount = 1000,
    /// Amount does not fit the target precision
    AmountOverflow = 1001,
    /// Malformed address
    InvalidAddress = 2000,
    /// Invalid request/data
    InvalidData = 3000,
    /// Transfer has no resolved sender
    MissingSender = 3001,
    /// Strategy was generated without holdings and cannot be executed
    ProposedStrategy = 3002,
    /// Reset refused because a signature is pending or unconfirmed
    ResetRefused = 4000,
    /// Configuration error
    Config = 5000,
    /// Serialization error
    Serialization = 5001,
    /// I/O error
    Io = 5002,
    /// Internal/unexpected error
    Internal = 9999,
}

/// Why a reset was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetRefusal {
    /// The wallet is currently prompting the user for a signature.
    SignatureInFlight,
    /// A signed transaction is awaiting confirmation.
    AwaitingConfirmation,
}

impl std::fmt::Display for ResetRefusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SignatureInFlight => write!(f, "a signature request is in flight"),
            Self::AwaitingConfirmation => {
                write!(f, "a signed transaction is awaiting confirmation")
            }
        }
    }
}

/// Error type for Chainpay operations.
#[derive(Debug, Error)]
pub enum ChainpayError {
    /// Amount could not be parsed or is negative.
    #[error("invalid amount '{value}': {reason}")]
    InvalidAmount {
        /// The offending input
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// Scaling an amount overflowed the representable range.
    #[error("amount overflow converting to {decimals} decimals")]
    AmountOverflow {
        /// Target precision
        decimals: u8,
    },

    /// Address is not a 0x-prefixed 20-byte hex string.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid data provided.
    #[error("invalid {field}: {reason}")]
    InvalidData {
        /// Field or parameter name
        field: String,
        /// Reason for invalidity
        reason: String,
    },

    /// The transfer has no sender and cannot be executed.
    #[error("transfer has no sender address")]
    MissingSender,

    /// A proposed (illustrative) strategy was handed to the executor.
    #[error("strategy for {ticker} on network {network_id} is proposed only")]
    ProposedStrategy {
        /// Asset ticker
        ticker: String,
        /// Network of the asset
        network_id: u64,
    },

    /// Reset refused to avoid abandoning a signature.
    #[error("reset refused: {0}")]
    ResetRefused(ResetRefusal),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal/unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChainpayError {
    /// Get the error code for FFI/telemetry integration.
    pub fn code(&self) -> ChainpayErrorCode {
        match self {
            Self::InvalidAmount { .. } => ChainpayErrorCode::InvalidAmount,
            Self::AmountOverflow { .. } => ChainpayErrorCode::AmountOverflow,
            Self::InvalidAddress(_) => ChainpayErrorCode::InvalidAddress,
            Self::InvalidData { .. } => ChainpayErrorCode::InvalidData,
            Self::MissingSender => ChainpayErrorCode::MissingSender,
            Self::ProposedStrategy { .. } => ChainpayErrorCode::ProposedStrategy,
            Self::ResetRefused(_) => ChainpayErrorCode::ResetRefused,
            Self::Config(_) => ChainpayErrorCode::Config,
            Self::Serialization(_) => ChainpayErrorCode::Serialization,
            Self::Io(_) => ChainpayErrorCode::Io,
            Self::Internal(_) => ChainpayErrorCode::Internal,
        }
    }

    /// Get the error message as an owned String.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Returns true if retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ResetRefused(_) | Self::Io(_))
    }

    /// Create an invalid amount error.
    pub fn invalid_amount(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAmount {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidData {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ChainpayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = ChainpayError::ResetRefused(ResetRefusal::SignatureInFlight);
        assert_eq!(err.code(), ChainpayErrorCode::ResetRefused);
        assert!(err.is_retryable());
        assert!(err.to_string().contains("signature request is in flight"));
    }

    #[test]
    fn test_error_display() {
        let err = ChainpayError::ProposedStrategy {
            ticker: "USDC".into(),
            network_id: 8453,
        };
        assert!(err.to_string().contains("USDC"));
        assert!(err.to_string().contains("8453"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_helper_constructors() {
        let err = ChainpayError::invalid_amount("-1", "must not be negative");
        assert_eq!(err.code(), ChainpayErrorCode::InvalidAmount);

        let err = ChainpayError::invalid_data("decimals", "too large");
        assert_eq!(err.code(), ChainpayErrorCode::InvalidData);
    }

    #[test]
    fn test_from_serde_json() {
        let err: ChainpayError = serde_json::from_str::<u64>("nope").unwrap_err().into();
        assert_eq!(err.code(), ChainpayErrorCode::Serialization);
    }
}
