use std::{net::SocketAddr, sync::Arc};

use rand::{rngs::StdRng, SeedableRng};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod geo;
mod geocode;
mod handlers;
mod model;
mod notifications;
mod openapi;
mod reports_memory;
mod seed;
mod store;

use crate::{
    config::load_config,
    geocode::ReverseGeocoder,
    handlers::{create_router, AppState},
    notifications::InMemoryNotifications,
    reports_memory::InMemoryReports,
};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "civic_reports=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🔧 Initializing configuration from environment variables...");
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to initialize config: {}", e))?;
    tracing::info!("✅ Configuration loaded successfully");
    tracing::debug!("Community radius: {} km", config.community_radius_km);
    tracing::debug!("Geocoder: {} (enabled={})", config.geocoder_url, config.geocode_enabled);

    let notifications = Arc::new(InMemoryNotifications::new());
    let reports = Arc::new(InMemoryReports::new(notifications.clone()));

    if config.seed_report_count > 0 {
        tracing::info!("📥 Seeding {} sample reports...", config.seed_report_count);
        let mut rng = match config.seed_rng {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let seeded = seed::seed_sample_data(&reports, config.seed_report_count, &mut rng);
        tracing::info!("✅ Loaded {} sample reports into memory", seeded);
    }

    let geocoder = if config.geocode_enabled {
        match ReverseGeocoder::new(&config) {
            Ok(g) => Some(Arc::new(g)),
            Err(e) => {
                tracing::warn!("Reverse geocoder unavailable: {}. Location names will not be backfilled.", e);
                None
            }
        }
    } else {
        None
    };

    let port = config.server_port;
    let app = create_router(AppState {
        reports,
        notifications,
        geocoder,
        config: Arc::new(config),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🚀 Civic reports server starting on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, shutting down gracefully...");
        },
    }
}
