//! Deterministic strategy ordering.

use crate::config::PriorityTable;
use crate::payment::Strategy;

/// Sort key: (network rank, asset rank), unlisted entries last.
fn priority_key(table: &PriorityTable, strategy: &Strategy) -> (usize, usize) {
    let asset = &strategy.transfer.asset;
    (
        table.network_rank(asset.network_id()).unwrap_or(usize::MAX),
        table.asset_rank(asset.ticker()).unwrap_or(usize::MAX),
    )
}

/// Order strategies by network priority, then asset priority.
pub fn prioritize(mut strategies: Vec<Strategy>, table: &PriorityTable) -> Vec<Strategy> {
    strategies.sort_by_cached_key(|strategy| priority_key(table, strategy));
    strategies
}
