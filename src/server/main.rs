use std::sync::Arc;

use tracing::{error, info};
use watch_party::config::Config;
use watch_party::server::telemetry::{init_telemetry, shutdown_telemetry};
use watch_party::server::{create_router, HyperbeamProvisioner, Hub};

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("watch-party: {}", e);
            std::process::exit(1);
        }
    };

    init_telemetry(&config).await?;
    info!(?config, "Starting watch party hub");

    let provisioner = HyperbeamProvisioner::from_config(&config)?;
    let hub = Hub::new(Arc::new(provisioner), config.provisioning_timeout);
    let app = create_router(hub, config.connection_buffer);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Listening for participants and session requests");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "Server stopped with an error");
    }

    shutdown_telemetry(&config);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
