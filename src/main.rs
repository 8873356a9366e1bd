//! tx-confirm - wait for a Solana transaction to reach a commitment level
//!
//! Polls `getSignatureStatuses` for one signature and exits zero once the
//! desired level is observed, non-zero on an on-chain error, a failed status
//! query, or the deadline.

use anyhow::{Context, Result};
use clap::Parser;
use solana_client::nonblocking::rpc_client::RpcClient;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tx_confirm::config::Config;
use tx_confirm::confirmation::{ConfirmationPoller, DurabilityLevel, RpcStatusQuery};
use tx_confirm::Signature;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base58 transaction signature to confirm
    signature: String,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// RPC endpoint URL
    #[arg(short, long, env = "CONFIRM_RPC_URL")]
    url: Option<String>,

    /// Commitment to wait for (processed, confirmed, finalized)
    #[arg(long)]
    commitment: Option<DurabilityLevel>,

    /// Total time budget in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Delay between polls in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Also search signatures outside the recent status cache
    #[arg(long)]
    search_history: bool,

    /// Print the status record as JSON
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.log_json);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    config.validate().context("Invalid configuration")?;

    let signature = Signature::from_str(args.signature.trim())
        .with_context(|| format!("Invalid signature '{}'", args.signature))?;
    let request = config.confirm.to_request(signature);

    info!(
        url = %config.rpc.url,
        signature = %signature,
        commitment = %request.desired_level,
        timeout_ms = config.confirm.timeout_ms,
        "Confirming transaction"
    );

    let client = Arc::new(RpcClient::new_with_timeout_and_commitment(
        config.rpc.url.clone(),
        Duration::from_secs(config.rpc.timeout_secs),
        request.desired_level.commitment(),
    ));
    let poller = ConfirmationPoller::new(RpcStatusQuery::new(client));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received shutdown signal, abandoning confirmation");
            on_signal.cancel();
        }
    });

    let record = poller.confirm_with_cancel(&request, &cancel).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        let level = record
            .observed_level
            .map(|l| l.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!("{} {} (slot {})", signature, level, record.slot);
    }
    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "tx_confirm=debug,info"
    } else {
        "tx_confirm=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

/// Load configuration from file (or defaults) and apply command line overrides
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => Config::from_env().context("Failed to read environment overrides")?,
    };

    if let Some(url) = &args.url {
        config.rpc.url = url.clone();
    }
    if let Some(commitment) = args.commitment {
        config.confirm.commitment = commitment;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.confirm.timeout_ms = timeout_ms;
    }
    if let Some(poll_interval_ms) = args.poll_interval_ms {
        config.confirm.poll_interval_ms = poll_interval_ms;
    }
    if args.search_history {
        config.confirm.search_transaction_history = true;
    }
    Ok(config)
}
