//! Strategy Selector
//!
//! Tracks which candidate is "current" across regenerated candidate lists.
//! A manual choice is remembered by [`SelectionKey`] rather than by value,
//! so it survives regeneration (new amount, refreshed holdings). Disabled
//! networks always win over a manual choice.

use crate::payment::{SelectionKey, Strategy};
use crate::NetworkId;
use std::collections::BTreeSet;

/// Snapshot of the selector's current answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionResult {
    /// The best enabled candidate.
    pub best: Option<Strategy>,
    /// Remaining enabled candidates in priority order.
    pub others: Vec<Strategy>,
}

impl SelectionResult {
    /// All enabled candidates, best first.
    pub fn all_strategies(&self) -> Vec<Strategy> {
        self.best.iter().chain(self.others.iter()).cloned().collect()
    }
}

/// Selector over a prioritized candidate list.
#[derive(Clone, Debug, Default)]
pub struct StrategySelector {
    candidates: Vec<Strategy>,
    disabled_networks: BTreeSet<NetworkId>,
    selection: Option<SelectionKey>,
}

impl StrategySelector {
    /// Create an empty selector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a selector over an already prioritized list.
    pub fn with_candidates(candidates: Vec<Strategy>) -> Self {
        Self {
            candidates,
            ..Self::default()
        }
    }

    /// Replace the candidates with a freshly generated, prioritized list.
    ///
    /// Disabled networks and the manual selection are kept.
    pub fn set_candidates(&mut self, candidates: Vec<Strategy>) {
        self.candidates = candidates;
    }

    /// Current candidates, including those on disabled networks.
    pub fn candidates(&self) -> &[Strategy] {
        &self.candidates
    }

    fn is_enabled(&self, strategy: &Strategy) -> bool {
        !self.disabled_networks.contains(&strategy.network_id())
    }

    fn best_index(&self) -> Option<usize> {
        let enabled = |(_, s): &(usize, &Strategy)| self.is_enabled(s);

        if let Some(key) = &self.selection {
            if let Some((index, _)) = self
                .candidates
                .iter()
                .enumerate()
                .filter(enabled)
                .find(|(_, s)| key.matches(s))
            {
                return Some(index);
            }
        }

        self.candidates
            .iter()
            .enumerate()
            .find(enabled)
            .map(|(index, _)| index)
    }

    /// The manually selected candidate if enabled, else the first enabled one.
    pub fn best(&self) -> Option<&Strategy> {
        self.best_index().map(|index| &self.candidates[index])
    }

    /// Enabled candidates other than [`best`](Self::best), in order.
    pub fn others(&self) -> Vec<&Strategy> {
        let best = self.best_index();
        self.candidates
            .iter()
            .enumerate()
            .filter(|(index, s)| Some(*index) != best && self.is_enabled(s))
            .map(|(_, s)| s)
            .collect()
    }

    /// Owned snapshot of `best` and `others`.
    pub fn result(&self) -> SelectionResult {
        SelectionResult {
            best: self.best().cloned(),
            others: self.others().into_iter().cloned().collect(),
        }
    }

    /// Exclude every candidate on `network_id` until [`reset`](Self::reset).
    pub fn disable_network(&mut self, network_id: NetworkId) {
        if self.disabled_networks.insert(network_id) {
            tracing::debug!(%network_id, "network disabled for selection");
        }
    }

    /// Check if a network is disabled.
    pub fn is_network_disabled(&self, network_id: NetworkId) -> bool {
        self.disabled_networks.contains(&network_id)
    }

    /// Disabled networks in ascending id order.
    pub fn disabled_networks(&self) -> Vec<NetworkId> {
        self.disabled_networks.iter().copied().collect()
    }

    /// Remember `strategy` as the manual choice.
    ///
    /// Does not imply the strategy is affordable or enabled.
    pub fn select(&mut self, strategy: &Strategy) {
        self.selection = Some(strategy.selection_key());
    }

    /// The remembered manual choice.
    pub fn selection_key(&self) -> Option<&SelectionKey> {
        self.selection.as_ref()
    }

    /// Forget the manual choice.
    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Re-enable all networks.
    pub fn reset(&mut self) {
        self.disabled_networks.clear();
    }
}
