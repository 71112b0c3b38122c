//! Chainpay Demo CLI
//!
//! Command-line interface for exploring payment strategies and running the
//! transfer executor against an in-memory wallet.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod ui;

use commands::simulate::SimulateOptions;
use commands::PaymentArgs;

#[derive(Parser)]
#[command(name = "chainpay-demo")]
#[command(about = "Chainpay Demo CLI - plan and execute multi-network payments", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List prioritized strategies for a payment
    Strategies {
        #[command(flatten)]
        payment: PaymentArgs,

        /// Print the candidates as JSON
        #[arg(long)]
        json: bool,
    },

    /// Execute the best strategy against a simulated wallet
    Simulate {
        #[command(flatten)]
        payment: PaymentArgs,

        #[command(flatten)]
        options: SimulateOptions,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("chainpay_demo_cli=debug,chainpay_lib=debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("chainpay_demo_cli=info,chainpay_lib=warn")
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Strategies { payment, json } => {
            commands::strategies::run(&payment, json, cli.verbose).await?;
        }
        Commands::Simulate { payment, options } => {
            commands::simulate::run(&payment, &options, cli.verbose).await?;
        }
    }

    Ok(())
}
