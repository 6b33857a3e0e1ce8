use statement_classifier::{
    api::{build_router, AppState},
    config::Config,
    service::PredictorService,
    telemetry::init_tracing,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });
    config.validate()?;

    init_tracing(&config.observability, config.server.debug);

    tracing::info!(
        "Starting {} v{}",
        config.observability.service_name,
        env!("CARGO_PKG_VERSION")
    );

    // Load the model once; a failure leaves the service degraded
    let predictor = PredictorService::load(&config.model.artifact_path);
    if !predictor.is_ready() {
        tracing::warn!("⚠️  No model loaded, /api/predict will answer with errors");
    }

    let app = build_router(AppState::new(predictor));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🚀 HTTP API server listening on http://{}", addr);
    tracing::info!("   Health check: http://{}/health", addr);
    tracing::info!("   Predict: http://{}/api/predict", addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down gracefully...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
