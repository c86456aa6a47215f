//! p2plinkd: Wi-Fi Direct link manager daemon.

use std::sync::Arc;

use anyhow::Result;

use p2plink_core::config::P2pLinkConfig;
use p2plink_services::{CoordinatorSettings, EventLog, LinkCoordinator, LoopbackPlatform};

mod pump;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = P2pLinkConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let mut config = P2pLinkConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        P2pLinkConfig::default()
    });

    if let Some(interface) = std::env::args().nth(1) {
        config.loopback.interface = interface;
    }
    tracing::info!(
        interface = %config.loopback.interface,
        device = %config.loopback.device_address,
        port = config.api.port,
        "p2plinkd starting"
    );

    // Platform and coordinator
    let (platform, platform_events) = LoopbackPlatform::new(config.loopback.clone());
    let (coordinator, link_events) = LinkCoordinator::new(
        Arc::new(platform),
        CoordinatorSettings::from_config(&config.link),
    );
    let event_log = EventLog::default();

    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    // Ctrl-C → shutdown broadcast
    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let coordinator_task = {
        let coordinator = coordinator.clone();
        let shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move {
            coordinator.startup().await;
            coordinator.run(platform_events, shutdown).await;
        })
    };

    let pump_task = tokio::spawn(pump::event_pump(link_events, event_log.clone()));

    {
        let state = p2plink_api::ApiState {
            coordinator: coordinator.clone(),
            events: event_log.clone(),
            shutdown_tx: shutdown_tx.clone(),
        };
        let port = config.api.port;
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = p2plink_api::serve(state, port).await {
                tracing::error!(error = %e, "API server failed");
                let _ = shutdown.send(());
            }
        });
    }

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv() => tracing::info!("shutting down"),
        r = coordinator_task   => tracing::error!("coordinator exited: {:?}", r),
        r = pump_task          => tracing::error!("event pump exited: {:?}", r),
    }

    coordinator.shutdown().await;
    Ok(())
}
