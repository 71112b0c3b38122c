//! Strategies command - list prioritized candidates for a payment

use anyhow::Result;
use chainpay_lib::assets::StaticTokenRegistry;
use chainpay_lib::holdings::HoldingsProvider;
use chainpay_lib::payment::StrategyMode;
use chainpay_lib::strategy::{StrategyEngine, StrategySelector};
use colored::Colorize;
use std::sync::Arc;

use super::{describe_strategy, PaymentArgs};
use crate::ui;

pub async fn run(args: &PaymentArgs, json: bool, verbose: bool) -> Result<()> {
    let config = args.engine_config()?;
    let payment = args.payment(None)?;
    let holdings = args.load_holdings()?;
    let prefs = args.preferences();

    let engine = StrategyEngine::new(
        Arc::new(StaticTokenRegistry::with_defaults()),
        config.priorities,
    );
    let strategies = engine.strategies(
        &payment,
        &prefs,
        holdings.as_ref().map(|h| h as &dyn HoldingsProvider),
    );
    tracing::debug!(count = strategies.len(), "Generated strategies");

    if json {
        ui::json(&serde_json::to_value(&strategies)?);
        return Ok(());
    }

    ui::header(&format!("Strategies for {}", payment));
    if verbose {
        ui::key_value("Receiver", payment.receiver().as_str());
        if let Some(sender) = payment.sender() {
            ui::key_value("Sender", sender.as_str());
        }
    }

    let selector = StrategySelector::with_candidates(strategies);
    let Some(best) = selector.best() else {
        if holdings.is_some() {
            ui::warning("No affordable strategy for this payment");
        } else {
            ui::warning("No strategy available for this payment");
        }
        return Ok(());
    };

    println!("{} {}", "→".green().bold(), describe_strategy(best).green());
    for strategy in selector.others() {
        println!("  {}", describe_strategy(strategy));
    }

    ui::separator();
    if best.mode == StrategyMode::Proposed {
        ui::info("Proposed only: pass --from and --holdings to check affordability");
    } else {
        ui::success(&format!("{} affordable strategies", selector.candidates().len()));
    }

    Ok(())
}
