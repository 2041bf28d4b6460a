use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use tokio::signal;

use polygon_deposit_relay::blockchain::{BlockMonitor, RelayExecutor, RpcClient};
use polygon_deposit_relay::config::{AppConfig, RelayContext};
use polygon_deposit_relay::logging::init_logging;

#[derive(Parser)]
#[command(name = "relayer")]
#[command(about = "Watches a relay contract for deposits and forwards them to a destination address")]
#[command(version)]
struct Args {
    /// Config file path (defaults to $CONFIG_FILE or ./config.toml)
    #[arg(long)]
    config: Option<String>,

    /// Print a sample config file and exit
    #[arg(long)]
    print_sample_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.print_sample_config {
        println!("{}", AppConfig::generate_sample_config()?);
        return Ok(());
    }

    let loaded = match &args.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config.logging);

    let context = match RelayContext::from_env(&config) {
        Ok(context) => context,
        Err(e) => {
            error!("Failed to build relay context: {}", e);
            std::process::exit(1);
        }
    };

    let client = Arc::new(RpcClient::from_config(&config.rpc)?);
    info!(
        "Watching {} on {} (operator {}, {} tokens)",
        context.watched_address,
        client.endpoint(),
        context.operator(),
        context.tokens.len()
    );

    let executor = RelayExecutor::new(client.clone(), context.clone());
    let monitor = BlockMonitor::new(client, executor, &context);
    let scan_task = tokio::spawn(monitor.run_forever());

    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal, stopping scan loop"),
        Err(e) => {
            error!("Unable to listen for shutdown signal: {}", e);
            scan_task.await?;
        }
    }

    Ok(())
}
