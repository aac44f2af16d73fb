mod api;
mod middleware;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use funneldash_ingest::FieldExtractor;
use funneldash_redtrack::RedTrackImporter;

use crate::{
    api::{build_app, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = funneldash_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let taxonomy = funneldash_core::load_taxonomy(&config.taxonomy_path)?;
    let extractor = Arc::new(FieldExtractor::new(taxonomy)?);

    // Lazy pool: the server comes up while Postgres is down and reads degrade
    // to empty results until it is back.
    let pool_config = funneldash_db::PoolConfig::from_app_config(&config);
    let pool = funneldash_db::connect_lazy(&config.database_url, pool_config)?;
    match funneldash_db::run_migrations(&pool).await {
        Ok(applied) => tracing::info!(applied, "migrations up to date"),
        Err(e) => tracing::warn!(error = %e, "migrations not applied; database unavailable?"),
    }

    let redtrack = RedTrackImporter::from_app_config(&config, Arc::clone(&extractor))?;
    if redtrack.is_none() {
        tracing::warn!("REDTRACK_API_KEY not set; RedTrack import disabled");
    }

    let state = AppState {
        store: Arc::new(funneldash_db::PgFunnelStore::new(pool)),
        extractor,
        schema: config.schema_version,
        insert_options: config.insert_options(),
        redtrack: redtrack.map(Arc::new),
    };

    let auth = AuthState::from_env(matches!(
        config.env,
        funneldash_core::Environment::Development
    ))?;
    let app = build_app(state, auth);

    tracing::info!(
        addr = %config.bind_addr,
        schema = %config.schema_version,
        env = %config.env,
        "funneldash server listening"
    );
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
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
