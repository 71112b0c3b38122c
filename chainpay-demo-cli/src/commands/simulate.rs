//! Simulate command - run the executor against an in-memory wallet

use anyhow::{anyhow, bail, Context, Result};
use chainpay_lib::amount::LogicalAmount;
use chainpay_lib::assets::{StaticTokenRegistry, TokenRegistry};
use chainpay_lib::context::EngineContext;
use chainpay_lib::executor::{
    ExecuteOutcome, ExecutionStatus, FailureKind, StatusKind, TransferExecutor,
};
use chainpay_lib::holdings::{HoldingsProvider, HoldingsSnapshot};
use chainpay_lib::payment::LogicalPayment;
use chainpay_lib::strategy::StrategySelector;
use chainpay_lib::wallet::{provider_errors, MockWallet};
use chainpay_lib::{Address, NetworkId};
use clap::Args;
use colored::Colorize;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::{describe_strategy, network_name, PaymentArgs};
use crate::ui;

/// Sender used when `--from` is not given.
pub const DEMO_SENDER: &str = "0x00000000000000000000000000000000000000aa";

/// Upper bound on `execute()` calls per candidate.
const MAX_ROUNDS: usize = 8;

/// Wallet behaviour to script.
#[derive(Args, Debug, Clone, Default)]
pub struct SimulateOptions {
    /// Network the wallet starts on
    #[arg(long, default_value_t = 1)]
    pub start_network: u64,

    /// The user rejects the first signature request
    #[arg(long)]
    pub reject_first_signature: bool,

    /// The first signature fails with a stale fee
    #[arg(long)]
    pub stale_fee: bool,

    /// The first network tried cannot cover its fee
    #[arg(long)]
    pub unaffordable_fee: bool,

    /// The wallet cannot switch networks; the user does it by hand
    #[arg(long)]
    pub manual_switch: bool,

    /// Print every published status snapshot
    #[arg(long)]
    pub snapshots: bool,
}

pub async fn run(args: &PaymentArgs, options: &SimulateOptions, verbose: bool) -> Result<()> {
    let config = args.engine_config()?;
    let default_sender = Address::new(DEMO_SENDER)?;
    let payment = args.payment(Some(default_sender))?;
    let prefs = args.preferences();
    let holdings = match args.load_holdings()? {
        Some(holdings) => holdings,
        None => funded_holdings(&payment)?,
    };

    let wallet = Arc::new(scripted_wallet(options));
    let context = EngineContext::new(wallet.clone()).with_config(config);
    let engine = context.strategy_engine();

    ui::header(&format!("Simulating {}", payment));
    ui::key_value("Wallet network", &network_name(NetworkId(options.start_network)));

    let mut selector = StrategySelector::with_candidates(engine.strategies(
        &payment,
        &prefs,
        Some(&holdings as &dyn HoldingsProvider),
    ));

    loop {
        let best = selector
            .best()
            .cloned()
            .ok_or_else(|| anyhow!("No affordable strategy left for {}", payment))?;
        ui::separator();
        ui::info(&format!("Trying {}", describe_strategy(&best)));

        let executor = context.executor_for(&best)?;
        let printer = options.snapshots.then(|| spawn_snapshot_printer(&executor));

        let result = drive(&executor, &wallet).await;
        drop(executor);
        if let Some(printer) = printer {
            printer.await.context("Snapshot printer failed")?;
        }
        let status = result?;

        if status.is_success {
            ui::success("Payment confirmed");
            if let Some(receipt) = &status.receipt {
                ui::key_value("Transaction", &receipt.tx_hash);
                ui::key_value("Block", &receipt.block_number.to_string());
                ui::key_value("Confirmations", &receipt.confirmations.to_string());
            }
            if verbose {
                ui::key_value("Automatic retries", &status.retries.to_string());
            }
            return Ok(());
        }

        let failure = status
            .failure
            .ok_or_else(|| anyhow!("Executor stopped without success or failure"))?;
        if failure.kind != FailureKind::FeeUnaffordable {
            bail!("Payment failed: {}", failure);
        }

        let network_id = status.active_transfer.network_id();
        ui::warning(&format!(
            "Fee not affordable on {}, trying the next network",
            network_name(network_id)
        ));
        selector.disable_network(network_id);
        selector.set_candidates(engine.strategies(
            &payment,
            &prefs,
            Some(&holdings as &dyn HoldingsProvider),
        ));
    }
}

fn scripted_wallet(options: &SimulateOptions) -> MockWallet {
    let mut wallet = MockWallet::on_network(NetworkId(options.start_network));
    if options.manual_switch {
        wallet = wallet.without_switch_support();
    }
    if options.reject_first_signature {
        wallet.push_sign_error(provider_errors::user_rejected());
    }
    if options.stale_fee {
        wallet.push_sign_error(provider_errors::fee_too_low());
    }
    if options.unaffordable_fee {
        wallet.push_prepare_error(provider_errors::insufficient_funds_for_gas());
    }
    wallet
}

/// A generous balance of every asset the payment can be made in.
fn funded_holdings(payment: &LogicalPayment) -> Result<HoldingsSnapshot> {
    let registry = StaticTokenRegistry::with_defaults();
    let sender = payment
        .sender()
        .ok_or_else(|| anyhow!("Simulation needs a sender"))?;
    let budget = LogicalAmount::from_whole(1_000_000);

    let mut holdings = HoldingsSnapshot::new();
    for asset in registry.assets_for(payment.ticker()) {
        let balance = budget.to_asset_units(asset.decimals())?;
        holdings.set_balance(sender, &asset, balance);
    }
    Ok(holdings)
}

/// Execute until the executor needs something the demo cannot give it.
///
/// Rejections and warnings are answered by executing again, the way a user
/// would click the pay button a second time. A manual switch is simulated by
/// moving the wallet and notifying the executor.
async fn drive(executor: &TransferExecutor, wallet: &MockWallet) -> Result<ExecutionStatus> {
    for _ in 0..MAX_ROUNDS {
        let status = match executor.execute().await {
            ExecuteOutcome::Settled(status) => status,
            other => bail!("Unexpected executor outcome: {:?}", other),
        };

        match status.kind {
            StatusKind::Success | StatusKind::Error => return Ok(status),
            StatusKind::ReadyToExecute => {
                if let Some(warning) = &status.warning {
                    ui::warning(&warning.to_string());
                    if warning.kind.is_user_rejection() {
                        ui::info("User rejected, asking again");
                    }
                }
            }
            StatusKind::NeedToSwitchNetworkManually => {
                let target = status.active_transfer.network_id();
                ui::warning(&format!("Switch the wallet to {} manually", network_name(target)));
                wallet.set_active_network(Some(target));
                executor.notify_network_changed();
            }
            StatusKind::Idle | StatusKind::Loading => {
                bail!("Executor settled in unexpected state {:?}", status.kind)
            }
        }
    }
    bail!("Executor did not settle after {} attempts", MAX_ROUNDS)
}

fn spawn_snapshot_printer(executor: &TransferExecutor) -> JoinHandle<()> {
    let mut rx = executor.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let status = rx.borrow_and_update().clone();
            print_snapshot(&status);
        }
    })
}

fn print_snapshot(status: &ExecutionStatus) {
    let stage = status
        .loading_stage
        .map(|stage| format!(" ({:?})", stage))
        .unwrap_or_default();
    println!(
        "  {} {:?}{} signing={} signed={} retries={}",
        "status".dimmed(),
        status.kind,
        stage,
        status.is_user_signing,
        status.is_user_signed,
        status.retries
    );
}
