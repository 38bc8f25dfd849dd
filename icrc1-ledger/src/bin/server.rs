//! Ledger server binary

use anyhow::Context;
use icrc1_ledger::{spawn_ledger_actor, Config, Ledger};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load configuration: explicit path argument wins over LEDGER_* variables
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("loading configuration from {}", path))?,
        None => Config::from_env().context("loading configuration from environment")?,
    };

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        "Starting ICRC-1 ledger"
    );

    let ledger = Arc::new(Ledger::from_config(&config).context("initializing ledger")?);
    let handle = spawn_ledger_actor(ledger.clone(), config.actor.mailbox_capacity);

    tracing::info!(
        name = %handle.icrc1_name().await?,
        symbol = %handle.icrc1_symbol().await?,
        total_supply = %handle.icrc1_total_supply().await?,
        "Ledger ready"
    );

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down ledger");
    handle.shutdown().await?;
    ledger
        .check_conservation()
        .context("conservation check at shutdown")?;
    Ok(())
}
