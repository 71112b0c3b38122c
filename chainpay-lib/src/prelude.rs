//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use chainpay_lib::prelude::*;
//! ```

// Core types
pub use crate::{Address, NetworkId};
pub use crate::amount::{LogicalAmount, TokenAmount};
pub use crate::assets::{Asset, AssetId, StaticTokenRegistry, TokenRegistry};
pub use crate::payment::{LogicalPayment, SelectionKey, Strategy, StrategyMode, Transfer};
pub use crate::holdings::{HoldingsProvider, HoldingsSnapshot};

// Error handling
pub use crate::errors::{ChainpayError, ChainpayErrorCode, ResetRefusal};
pub use crate::Result;

// Configuration
pub use crate::config::{EngineConfig, ExecutorConfig, PriorityTable};
pub use crate::context::EngineContext;

// Strategy engine
pub use crate::strategy::{
    generate, prioritize, SelectionResult, StrategyEngine, StrategyPreferences, StrategySelector,
};

// Execution
pub use crate::classifier::{classify, ErrorKind};
pub use crate::executor::{
    ExecuteOutcome, ExecutionFailure, ExecutionStatus, ExecutionWarning, FailureKind,
    LoadingStage, Phase, StatusKind, TransferExecutor,
};

// Wallet boundary
pub use crate::wallet::{
    MockWallet, PreparedTransfer, ProviderError, Receipt, TxHandle, WalletCapability,
};
