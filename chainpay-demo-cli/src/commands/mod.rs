//! CLI command implementations

pub mod simulate;
pub mod strategies;

use anyhow::{Context, Result};
use chainpay_lib::amount::LogicalAmount;
use chainpay_lib::config::EngineConfig;
use chainpay_lib::holdings::HoldingsSnapshot;
use chainpay_lib::payment::{LogicalPayment, Strategy};
use chainpay_lib::strategy::StrategyPreferences;
use chainpay_lib::{Address, NetworkId};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

/// Payment description shared by all commands.
#[derive(Args, Debug, Clone)]
pub struct PaymentArgs {
    /// Receiving address (0x + 40 hex chars)
    #[arg(long)]
    pub to: String,

    /// Amount in logical units, e.g. 12.50
    #[arg(long)]
    pub amount: String,

    /// Logical ticker the amount is denominated in
    #[arg(long, default_value = "USD")]
    pub ticker: String,

    /// Paying address
    #[arg(long)]
    pub from: Option<String>,

    /// JSON file with payer balances
    #[arg(long)]
    pub holdings: Option<PathBuf>,

    /// Exclude an asset ticker (repeatable)
    #[arg(long = "exclude-ticker")]
    pub exclude_tickers: Vec<String>,

    /// Exclude a network id (repeatable)
    #[arg(long = "exclude-network")]
    pub exclude_networks: Vec<u64>,

    /// Engine configuration file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl PaymentArgs {
    /// Build the logical payment, falling back to `default_sender`.
    pub fn payment(&self, default_sender: Option<Address>) -> Result<LogicalPayment> {
        let receiver = Address::new(&self.to).context("Invalid --to address")?;
        let amount = LogicalAmount::parse(&self.amount).context("Invalid --amount")?;
        let mut payment = LogicalPayment::new(receiver, &self.ticker, amount);

        let sender = match &self.from {
            Some(from) => Some(Address::new(from).context("Invalid --from address")?),
            None => default_sender,
        };
        if let Some(sender) = sender {
            payment = payment.with_sender(sender);
        }
        Ok(payment)
    }

    pub fn preferences(&self) -> StrategyPreferences {
        let mut prefs = StrategyPreferences::default();
        for ticker in &self.exclude_tickers {
            prefs = prefs.exclude_ticker(ticker);
        }
        for network in &self.exclude_networks {
            prefs = prefs.exclude_network(NetworkId(*network));
        }
        prefs
    }

    pub fn engine_config(&self) -> Result<EngineConfig> {
        match &self.config {
            Some(path) => EngineConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display())),
            None => Ok(EngineConfig::default()),
        }
    }

    pub fn load_holdings(&self) -> Result<Option<HoldingsSnapshot>> {
        let Some(path) = &self.holdings else {
            return Ok(None);
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read holdings from {}", path.display()))?;
        let holdings = HoldingsSnapshot::from_json(&json)
            .with_context(|| format!("Invalid holdings file {}", path.display()))?;
        Ok(Some(holdings))
    }
}

/// Human-readable network name for the well-known ids.
pub fn network_name(network_id: NetworkId) -> String {
    match network_id {
        NetworkId::ETHEREUM => "Ethereum".to_string(),
        NetworkId::OPTIMISM => "Optimism".to_string(),
        NetworkId::POLYGON => "Polygon".to_string(),
        NetworkId::BASE => "Base".to_string(),
        NetworkId::ARBITRUM => "Arbitrum".to_string(),
        other => format!("network {}", other),
    }
}

/// One line describing a candidate strategy.
pub fn describe_strategy(strategy: &Strategy) -> String {
    let transfer = &strategy.transfer;
    format!(
        "{} {} on {}",
        transfer.amount.format_units(transfer.asset.decimals()),
        transfer.asset.ticker().bold(),
        network_name(strategy.network_id())
    )
}
