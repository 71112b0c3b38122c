//! Strategy Engine
//!
//! Turns a [`LogicalPayment`] into concrete transfer candidates:
//!
//! 1. [`generate`] builds every candidate the registry allows, filtered by
//!    [`StrategyPreferences`] and, when known, the payer's holdings.
//! 2. [`prioritize`] orders them by a static [`PriorityTable`].
//! 3. [`StrategySelector`] tracks which candidate is current.
//!
//! # Example
//!
//! ```
//! use chainpay_lib::amount::LogicalAmount;
//! use chainpay_lib::assets::StaticTokenRegistry;
//! use chainpay_lib::config::PriorityTable;
//! use chainpay_lib::payment::LogicalPayment;
//! use chainpay_lib::strategy::{StrategyEngine, StrategyPreferences, StrategySelector};
//! use chainpay_lib::{Address, NetworkId};
//! use std::sync::Arc;
//!
//! let engine = StrategyEngine::new(
//!     Arc::new(StaticTokenRegistry::with_defaults()),
//!     PriorityTable::default(),
//! );
//! let receiver = Address::new("0x00000000000000000000000000000000000000bb").unwrap();
//! let payment = LogicalPayment::new(receiver, "USD", LogicalAmount::from_whole(5));
//!
//! let selector = StrategySelector::with_candidates(
//!     engine.strategies(&payment, &StrategyPreferences::default(), None),
//! );
//! assert_eq!(selector.best().unwrap().network_id(), NetworkId::BASE);
//! ```

mod generator;
mod preferences;
mod prioritizer;
mod selector;

pub use generator::generate;
pub use preferences::StrategyPreferences;
pub use prioritizer::prioritize;
pub use selector::{SelectionResult, StrategySelector};

use crate::assets::TokenRegistry;
use crate::config::PriorityTable;
use crate::holdings::HoldingsProvider;
use crate::payment::{LogicalPayment, Strategy};
use std::sync::Arc;

/// Generator and prioritizer bound to one registry and priority table.
#[derive(Clone)]
pub struct StrategyEngine {
    registry: Arc<dyn TokenRegistry>,
    priorities: PriorityTable,
}

impl StrategyEngine {
    /// Create an engine.
    pub fn new(registry: Arc<dyn TokenRegistry>, priorities: PriorityTable) -> Self {
        Self {
            registry,
            priorities,
        }
    }

    /// Priority table in use.
    pub fn priorities(&self) -> &PriorityTable {
        &self.priorities
    }

    /// Unordered candidates. See [`generate`].
    pub fn generate(
        &self,
        payment: &LogicalPayment,
        preferences: &StrategyPreferences,
        holdings: Option<&dyn HoldingsProvider>,
    ) -> Vec<Strategy> {
        generate(self.registry.as_ref(), payment, preferences, holdings)
    }

    /// Candidates in priority order.
    pub fn strategies(
        &self,
        payment: &LogicalPayment,
        preferences: &StrategyPreferences,
        holdings: Option<&dyn HoldingsProvider>,
    ) -> Vec<Strategy> {
        prioritize(
            self.generate(payment, preferences, holdings),
            &self.priorities,
        )
    }
}

impl std::fmt::Debug for StrategyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyEngine")
            .field("priorities", &self.priorities)
            .finish_non_exhaustive()
    }
}
