//! Versus Back binary entrypoint wiring REST, WebSocket, SSE, storage and the generator client.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{Context, bail};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use versus_back::{
    config::AppConfig,
    dao::match_store::{MatchStore, memory::MemoryMatchStore},
    routes,
    services::generator::HttpGenerator,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let generator =
        HttpGenerator::new(&config.generator.base_url).context("building generator client")?;
    info!(generator = %config.generator.base_url, "generator client ready");

    let app_state = AppState::new(config, Arc::new(generator));
    install_storage(&app_state).await?;

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Select the match store from `STORAGE_BACKEND` (`memory`, `mongo` or `couch`).
///
/// Remote backends are connected by the storage supervisor in the background;
/// until then the application answers in degraded mode.
async fn install_storage(state: &SharedState) -> anyhow::Result<()> {
    let backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "memory".into());

    match backend.trim().to_ascii_lowercase().as_str() {
        "memory" => {
            warn!("using the in-memory match store; matches are lost on restart");
            let store: Arc<dyn MatchStore> = Arc::new(MemoryMatchStore::new());
            state.set_match_store(store).await;
        }
        #[cfg(feature = "mongo-store")]
        "mongo" | "mongodb" => {
            use versus_back::dao::match_store::mongodb::{MongoConfig, MongoMatchStore};
            use versus_back::{dao::storage::StorageError, services::storage_supervisor};

            tokio::spawn(storage_supervisor::run(state.clone(), || async {
                let config = MongoConfig::from_env()?;
                let store = MongoMatchStore::connect(config).await?;
                Ok::<Arc<dyn MatchStore>, StorageError>(Arc::new(store))
            }));
        }
        #[cfg(feature = "couch-store")]
        "couch" | "couchdb" => {
            use versus_back::dao::match_store::couchdb::{CouchConfig, CouchMatchStore};
            use versus_back::{dao::storage::StorageError, services::storage_supervisor};

            tokio::spawn(storage_supervisor::run(state.clone(), || async {
                let config = CouchConfig::from_env()?;
                let store = CouchMatchStore::connect(config).await?;
                Ok::<Arc<dyn MatchStore>, StorageError>(Arc::new(store))
            }));
        }
        other => bail!("unsupported STORAGE_BACKEND `{other}`"),
    }

    info!(backend = %backend, "storage backend selected");
    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "cannot install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
