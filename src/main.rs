use std::sync::Arc;

use anyhow::Context;
use robin_relay::config::{ObjectStoreConfig, RelayConfig, TransportConfig};
use robin_relay::pipeline::{IntakeController, IntakeDeps};
use robin_relay::routes::relay_routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = RelayConfig::from_env().context("loading relay configuration")?;

    eprintln!("📬 Robin relay v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Sender: {}", config.noreply_address());
    eprintln!("   Lists: {}", config.lists.join(", "));
    eprintln!("   Parameters: {} under {}", config.parameter_namespace, config.parameter_root.display());
    match &config.object_store {
        ObjectStoreConfig::Filesystem { root } => eprintln!("   Objects: {}", root.display()),
        ObjectStoreConfig::Http { endpoint } => eprintln!("   Objects: {endpoint}"),
    }
    match &config.transport {
        TransportConfig::Smtp(smtp) => eprintln!("   Transport: smtp://{}:{}", smtp.host, smtp.port),
        TransportConfig::Outbox { dir } => eprintln!("   Transport: outbox {}", dir.display()),
    }

    let deps = IntakeDeps::from_config(&config)?;
    let controller = Arc::new(IntakeController::new(&config, deps)?);
    let app = relay_routes(controller);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "Relay listening");
    eprintln!("   Events: http://{}/events\n", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
