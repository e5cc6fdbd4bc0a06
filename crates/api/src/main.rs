use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hostwatch_api::background::Scheduler;
use hostwatch_api::config::ServerConfig;
use hostwatch_api::router::build_app_router;
use hostwatch_api::state::AppState;
use hostwatch_collector::SystemSampler;
use hostwatch_core::alerting::AlertManager;
use hostwatch_core::ring_buffer::MetricHistory;
use hostwatch_core::sampler::Sampler;
use hostwatch_core::store::{AlertStore, MemoryStore};
use hostwatch_db::PgStore;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "hostwatch_api=debug,hostwatch_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Storage ---
    let store: Arc<dyn AlertStore> = match &config.database_url {
        Some(database_url) => {
            let pool = hostwatch_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            hostwatch_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            hostwatch_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, alerts are kept in memory and lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    // --- Alerting ---
    let alerts = Arc::new(AlertManager::new(store).with_call_timeout(config.store_call_timeout()));
    let seeded = alerts
        .seed_default_rules()
        .await
        .expect("Failed to seed default alert rules");
    if seeded == 0 {
        tracing::debug!("Alert rules already present, skipping defaults");
    }

    // --- Sampling ---
    let system_sampler = SystemSampler::new(config.hostname.clone());
    tracing::info!(hostname = %system_sampler.hostname(), "Host sampler ready");
    let sampler: Arc<dyn Sampler> = Arc::new(system_sampler);
    let history = Arc::new(MetricHistory::default());

    // --- Scheduler ---
    let cancel = CancellationToken::new();
    let scheduler = Scheduler::new(
        Arc::clone(&alerts),
        Arc::clone(&history),
        Arc::clone(&sampler),
    )
    .with_call_timeout(config.store_call_timeout())
    .start(cancel.clone());

    // --- App state ---
    let state = AppState {
        alerts,
        history,
        sampler,
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    let server_cancel = cancel.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
    });

    let server_exited = tokio::select! {
        () = shutdown_signal() => false,
        result = &mut server => {
            tracing::error!(?result, "Server exited unexpectedly");
            true
        }
    };

    // --- Post-shutdown cleanup ---
    cancel.cancel();

    if !server_exited {
        tracing::info!("Draining open connections");
        match tokio::time::timeout(config.shutdown_timeout(), server).await {
            Ok(Ok(Ok(()))) => tracing::info!("Server stopped accepting connections"),
            Ok(Ok(Err(e))) => tracing::error!(error = %e, "Server error during shutdown"),
            Ok(Err(e)) => tracing::error!(error = %e, "Server task failed"),
            Err(_) => tracing::warn!(
                timeout_secs = config.shutdown_timeout_secs,
                "Connections still open after shutdown timeout"
            ),
        }
    }

    scheduler.shutdown().await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
