mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use refnet_discovery::{Collaborators, DiscoveryService, JsonFileSnapshotStore, WorkflowSettings};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(refnet_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = refnet_db::PoolConfig::from_app_config(&config);
    let pool = refnet_db::connect_pool(&config.database_url, pool_config).await?;
    refnet_db::run_migrations(&pool).await?;

    let _scheduler = scheduler::build_scheduler(pool.clone(), Arc::clone(&config)).await?;

    let service = build_service(&config, &pool)?;
    let auth = AuthState::from_env(matches!(config.env, refnet_core::Environment::Development))?;
    let app = build_app(
        AppState {
            service: Arc::new(service),
            pool,
        },
        auth,
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "refnet server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn build_service(
    config: &refnet_core::AppConfig,
    pool: &sqlx::PgPool,
) -> anyhow::Result<DiscoveryService> {
    let store = Arc::new(refnet_db::PgStore::new(pool.clone()));
    let places = Arc::new(refnet_places::PlacesClient::from_config(config)?);
    let geocoder = Arc::new(refnet_places::GeocodeClient::from_config(config)?);
    let snapshots = Arc::new(JsonFileSnapshotStore::new(config.snapshot_dir.clone()));

    Ok(DiscoveryService::new(
        Collaborators {
            clinics: store.clone(),
            geocoder,
            cache: store.clone(),
            places,
            network_reader: store.clone(),
            network_writer: store.clone(),
            tiers: store.clone(),
            usage: store,
            snapshots,
        },
        WorkflowSettings::from_app_config(config),
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
