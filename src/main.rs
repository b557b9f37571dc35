//! Gateway Bridge - Main Entry Point
//!
//! Replays a captured gateway session through the bridge and prints the
//! resulting position snapshot and market data as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use gateway_bridge::config::load_config;
use gateway_bridge::{Contract, FieldDecoder, GatewayBridge, ScriptedTransport};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Replay capture to feed through the bridge (one message per line, `|`-separated fields)
    #[arg(long, env = "BRIDGE_REPLAY")]
    replay: String,

    /// Comma-separated list of contract ids to request market data for
    #[arg(long)]
    contracts: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting gateway bridge");
    info!("Configuration file: {}", args.config);

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let config = load_config(Some(&args.config))?;
    let contracts = parse_contracts(args.contracts.as_deref())?;

    let transport = Arc::new(
        ScriptedTransport::from_replay_file(&args.replay)
            .with_context(|| format!("loading replay {}", args.replay))?,
    );
    let bridge = GatewayBridge::from_config(&config, transport, Arc::new(FieldDecoder::new()));

    bridge.connect_with(&config.gateway).await?;

    for contract in &contracts {
        bridge.request_market_data(contract)?;
    }

    let positions = match config.settings.positions_timeout_seconds {
        Some(seconds) => {
            bridge
                .get_positions_with_timeout(Duration::from_secs(seconds))
                .await
        }
        None => bridge.get_positions().await,
    };

    match positions {
        Ok(positions) => {
            let mut positions: Vec<_> = positions.into_iter().collect();
            positions.sort_by(|a, b| a.key().cmp(&b.key()));
            println!("{}", serde_json::to_string_pretty(&positions)?);
        }
        Err(e) => warn!("Position snapshot unavailable: {}", e),
    }

    for contract in &contracts {
        if let Some(record) = bridge.get_market_data(contract) {
            println!(
                "{}",
                serde_json::json!({ "con_id": contract.con_id, "market_data": record })
            );
        }
    }

    bridge.disconnect();
    info!("Gateway bridge stopped");

    Ok(())
}

fn parse_contracts(list: Option<&str>) -> Result<Vec<Contract>> {
    let Some(list) = list else {
        return Ok(Vec::new());
    };
    list.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<i64>()
                .map(Contract::with_id)
                .with_context(|| format!("invalid contract id: {}", id))
        })
        .collect()
}
