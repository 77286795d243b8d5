//! Fraud Explorer - command-line fraud diagnostics for blockchain addresses
//!
//! Usage:
//!   fraud_explorer analyze 0xADDRESS --chain ethereum [--page 2] [--json]
//!   fraud_explorer example [--json]
//!   fraud_explorer history [--clear]
//!   fraud_explorer chains
//!
//! Environment (a `.env` file is read if present):
//!   FLIPSIDE_API_KEY, SUPABASE_URL, SUPABASE_KEY - data sources (analyze only)
//!   FRAUD_EXPLORER_HISTORY       - search history file (default ./search_history.json)
//!   FRAUD_EXPLORER_LOOKBACK_DAYS - transfer window (default 7)
//!   RUST_LOG                     - log level, written to stderr (default info)

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use fraud_explorer::core::report::{render_text, title_case, AssessmentReport};
use fraud_explorer::utils::constants::{get_explorer_url, APP_VERSION};
use fraud_explorer::{
    AppError, AppResult, Blockchain, ExplorerConfig, FraudExplorer, SearchHistory,
    TelemetryCollector,
};

#[derive(Debug, Parser)]
#[command(name = "fraud_explorer", version = APP_VERSION)]
#[command(about = "Fraud risk diagnostics for blockchain addresses", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Assess an address (EOA or contract)
    Analyze {
        /// Address to assess (0x + 40 hex characters)
        address: String,

        /// Network the address lives on
        #[arg(short, long, default_value = "ethereum", value_name = "CHAIN")]
        chain: String,

        /// Page of the recent transfers table
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the report for the built-in example data
    Example {
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        #[arg(long)]
        json: bool,
    },

    /// Show or clear the search history
    History {
        /// Forget every remembered search
        #[arg(long)]
        clear: bool,
    },

    /// List supported networks
    Chains,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    match cli.command {
        Commands::Analyze {
            address,
            chain,
            page,
            json,
        } => {
            let blockchain: Blockchain = chain.parse()?;
            let config = ExplorerConfig::from_env()?;
            let telemetry = Arc::new(TelemetryCollector::new());
            let explorer = FraudExplorer::from_config(&config, telemetry)?;
            let report = explorer.assess(&address, blockchain).await?;
            print_report(&report, page, json)
        }
        Commands::Example { page, json } => {
            let config = ExplorerConfig::from_env()?;
            let report = FraudExplorer::example_report(config.lookback_days)?;
            print_report(&report, page, json)
        }
        Commands::History { clear } => {
            let config = ExplorerConfig::from_env()?;
            let history = SearchHistory::open(&config.history_path);
            if clear {
                let count = history.len();
                if !history.clear().await {
                    return Err(AppError::internal("Could not write the cleared history"));
                }
                println!("🗑️  Cleared {} searches", count);
                return Ok(());
            }

            let entries = history.list();
            if entries.is_empty() {
                println!("No searches yet.");
            }
            for entry in entries {
                println!(
                    "{}  {:<10} {}",
                    entry.timestamp,
                    title_case(entry.blockchain.id()),
                    entry.address
                );
            }
            Ok(())
        }
        Commands::Chains => {
            for chain in Blockchain::ALL {
                println!(
                    "{:<10} {:<18} chain id {:<6} {}",
                    chain.id(),
                    chain.label(),
                    chain.chain_id(),
                    get_explorer_url(chain.chain_id())
                );
            }
            Ok(())
        }
    }
}

fn print_report(report: &AssessmentReport, page: usize, json: bool) -> AppResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", render_text(report, page));
    }
    Ok(())
}
