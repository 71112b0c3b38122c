//! Candidate generation.

use super::preferences::StrategyPreferences;
use crate::assets::TokenRegistry;
use crate::holdings::HoldingsProvider;
use crate::payment::{LogicalPayment, Strategy, StrategyMode, Transfer};

/// Build every transfer that could settle `payment`.
///
/// Assets come from `registry` for the payment's ticker. An asset is dropped
/// when `preferences` exclude its ticker or network, when the logical
/// amount cannot be expressed in its precision, or, when `holdings` and the
/// sender are both known, when the payer's balance is below the required
/// amount (an unknown balance counts as insufficient). Without holdings or
/// sender the result is in [`StrategyMode::Proposed`].
///
/// The output is unordered; see [`prioritize`](super::prioritize).
pub fn generate(
    registry: &dyn TokenRegistry,
    payment: &LogicalPayment,
    preferences: &StrategyPreferences,
    holdings: Option<&dyn HoldingsProvider>,
) -> Vec<Strategy> {
    let affordability = holdings.zip(payment.sender());
    let mode = if affordability.is_some() {
        StrategyMode::Affordable
    } else {
        StrategyMode::Proposed
    };

    let mut strategies = Vec::new();
    for asset in registry.assets_for(payment.ticker()) {
        if preferences.excludes(&asset) {
            tracing::trace!(%asset, "excluded by preferences");
            continue;
        }

        let amount = match payment.amount().to_asset_units(asset.decimals()) {
            Ok(amount) => amount,
            Err(err) => {
                tracing::debug!(%asset, error = %err, "amount not representable");
                continue;
            }
        };

        if let Some((holdings, payer)) = affordability {
            match holdings.balance_of(payer, &asset) {
                Some(balance) if balance >= amount => {}
                balance => {
                    tracing::trace!(%asset, ?balance, required = %amount, "not affordable");
                    continue;
                }
            }
        }

        strategies.push(Strategy {
            payment: payment.clone(),
            transfer: Transfer {
                to_address: payment.receiver().clone(),
                from_address: payment.sender().cloned(),
                asset,
                amount,
            },
            mode,
        });
    }

    tracing::debug!(
        ticker = payment.ticker(),
        candidates = strategies.len(),
        ?mode,
        "generated strategies"
    );
    strategies
}
