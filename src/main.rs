use ccx_deck::{api, config::ServiceConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ccx_deck=debug,tower_http=debug,axum=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ccx-deck service");

    let config = ServiceConfig::from_env();
    tracing::info!("Using CalculiX command: {}", config.ccx_path);
    if let Some(dir) = &config.debug_export {
        tracing::info!("Exporting .inp/.dat copies to {:?}", dir);
    }

    // Verify CalculiX installation
    match std::process::Command::new(&config.ccx_path).arg("-v").output() {
        Ok(_) => tracing::info!("CalculiX found and accessible"),
        Err(e) => {
            tracing::warn!("CalculiX not found or not accessible: {}", e);
            tracing::warn!("Set CALCULIX_PATH environment variable to the correct path");
            tracing::warn!("Service will start but /api/v1/analyze will fail until CalculiX is available");
        }
    }

    let addr = config.bind_addr();
    let app = api::create_router(config);

    tracing::info!("Listening on {}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  GET  /health");
    tracing::info!("  GET  /api/v1/version");
    tracing::info!("  POST /api/v1/parse");
    tracing::info!("  POST /api/v1/validate");
    tracing::info!("  POST /api/v1/normalize");
    tracing::info!("  POST /api/v1/analyze");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
