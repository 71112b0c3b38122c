//! Caller-owned engine context.
//!
//! Bundles the collaborators the engine needs so nothing is looked up from
//! global state. Create one per wallet session and drop it with the session.

use crate::assets::{StaticTokenRegistry, TokenRegistry};
use crate::config::{EngineConfig, ExecutorConfig, PriorityTable};
use crate::executor::TransferExecutor;
use crate::payment::Strategy;
use crate::strategy::StrategyEngine;
use crate::wallet::WalletCapability;
use crate::Result;
use std::sync::Arc;

/// Registry, priorities, wallet and executor settings for one session.
#[derive(Clone)]
pub struct EngineContext {
    registry: Arc<dyn TokenRegistry>,
    priorities: PriorityTable,
    wallet: Arc<dyn WalletCapability>,
    executor_config: ExecutorConfig,
}

impl EngineContext {
    /// Context with the built-in registry and default configuration.
    pub fn new(wallet: Arc<dyn WalletCapability>) -> Self {
        Self {
            registry: Arc::new(StaticTokenRegistry::with_defaults()),
            priorities: PriorityTable::default(),
            wallet,
            executor_config: ExecutorConfig::default(),
        }
    }

    /// Use a different token registry.
    pub fn with_registry(mut self, registry: Arc<dyn TokenRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Apply a loaded configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.priorities = config.priorities;
        self.executor_config = config.executor;
        self
    }

    pub fn registry(&self) -> &Arc<dyn TokenRegistry> {
        &self.registry
    }

    pub fn wallet(&self) -> &Arc<dyn WalletCapability> {
        &self.wallet
    }

    pub fn executor_config(&self) -> &ExecutorConfig {
        &self.executor_config
    }

    /// Strategy engine over this context's registry and priorities.
    pub fn strategy_engine(&self) -> StrategyEngine {
        StrategyEngine::new(Arc::clone(&self.registry), self.priorities.clone())
    }

    /// Executor for `strategy` on this context's wallet.
    ///
    /// Fails for proposed strategies and transfers without a sender.
    pub fn executor_for(&self, strategy: &Strategy) -> Result<TransferExecutor> {
        TransferExecutor::new(
            Arc::clone(&self.wallet),
            strategy,
            self.executor_config.clone(),
        )
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("priorities", &self.priorities)
            .field("executor_config", &self.executor_config)
            .finish_non_exhaustive()
    }
}
