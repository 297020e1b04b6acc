use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use futures::future::join_all;
use tracing::{error, info};

use suistream_access::app::AppState;
use suistream_access::block_chain::ChainClients;
use suistream_access::config::AppConfig;
use suistream_access::routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Missing configuration for the selected network is fatal
    let config = AppConfig::from_env().context("Invalid configuration")?;
    let bind_addr = config.bind_addr.clone();
    info!(
        network = %config.network,
        package = %config.current().package_id,
        rpc = %config.current().full_node_url,
        "starting suistream access service"
    );

    let chains = ChainClients::from_config(&config)?;
    let state = web::Data::new(AppState::new(config, chains));

    // Set up signal handler for graceful shutdown
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);

    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C signal, shutting down gracefully...");
                let _ = shutdown_tx_clone.send(()).await;
            }
            Err(err) => {
                error!(error = %err, "Error setting up Ctrl+C handler");
            }
        }
    });

    let background = state.spawn_background(stop_rx);

    let state_clone = state.clone();
    let http_server = HttpServer::new(move || {
        let cors = Cors::permissive();
        App::new()
            .wrap(cors)
            .app_data(state_clone.clone())
            .configure(routes::configure)
    })
    .bind(&bind_addr)
    .with_context(|| format!("Cannot bind {}", bind_addr))?
    .disable_signals()
    .run();
    let server_handle = http_server.handle();

    tokio::select! {
        result = http_server => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server terminated");
            }
        }
        _ = shutdown_rx.recv() => info!("Shutdown signal received, terminating all tasks"),
    }

    server_handle.stop(true).await;
    let _ = stop_tx.send(true);
    join_all(background).await;

    info!("Application shutdown complete");
    Ok(())
}
