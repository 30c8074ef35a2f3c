use std::{net::SocketAddr, sync::Arc};

use ledger_sim::{gateway::build_router, LocalLedger};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::load_settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = load_settings();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log_filter))
        .init();

    let genesis = settings.genesis()?;
    info!(
        owner = %genesis.owner,
        super_owner = %genesis.super_owner,
        campaign_fee = %genesis.campaign_fee,
        "deploying local crowdfunding ledger"
    );
    let ledger = Arc::new(LocalLedger::new(genesis));
    let app = build_router(ledger);

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, "devnet listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
