//! Kestrel server binary.

use std::sync::Arc;

use anyhow::Context;
use kestrel_core::{InMemoryRecordStore, system_clock};
use kestrel_server::{AppState, Settings, metrics::init_metrics, run_server};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load().context("failed to load settings")?;
    let addr = settings.server.socket_addr()?;

    tracing::info!(
        "Starting Kestrel server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let prometheus = init_metrics().context("failed to install metrics recorder")?;

    let store = kestrel_store::connect(&settings.store)
        .await
        .with_context(|| format!("failed to connect to {:?} store", settings.store.backend()))?;

    let clock = system_clock();
    // Relational storage is out of scope; the in-process record store
    // stands in for it.
    let records = Arc::new(InMemoryRecordStore::with_clock(clock.clone()));

    let state = AppState::new(store, records, settings, clock);

    run_server(addr, state, prometheus).await?;

    Ok(())
}
