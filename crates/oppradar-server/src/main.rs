mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::SchedulerAuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(oppradar_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = oppradar_db::PoolConfig::from_app_config(&config);
    let pool = oppradar_db::connect_pool(&config.database_url, pool_config).await?;
    oppradar_db::run_migrations(&pool).await?;

    let ingest = oppradar_ingest::IngestClient::from_config(&config)?;
    let analysis = oppradar_analyze::AnalysisClient::from_config(&config)?;

    let _scheduler = scheduler::build_scheduler(
        pool.clone(),
        Arc::clone(&config),
        ingest.clone(),
        analysis.clone(),
    )
    .await?;

    let auth = SchedulerAuthState::from_config(&config);
    let bind_addr = config.bind_addr;
    let app = build_app(
        AppState {
            pool,
            config,
            ingest,
            analysis,
        },
        auth,
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
