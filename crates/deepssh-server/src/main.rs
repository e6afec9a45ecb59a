mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use deepssh_api::credentials::{AdminCredentials, CredentialVerifier};
use deepssh_api::{AppState, AppStateInner};
use deepssh_gateway::connection;
use deepssh_gateway::dispatcher::Dispatcher;
use deepssh_store::{SqliteBackend, Store};

use crate::config::{AdminPassword, Config, StorageKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deepssh_server=debug,deepssh_api=debug,deepssh_store=debug,deepssh_gateway=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let verifier: Arc<dyn CredentialVerifier> = Arc::new(match &config.admin_password {
        AdminPassword::Hash(hash) => AdminCredentials::from_hash(&config.admin_username, hash)?,
        AdminPassword::Plaintext(password) => {
            AdminCredentials::from_plaintext(&config.admin_username, password)?
        }
    });

    // Init storage
    let store = Arc::new(match config.storage {
        StorageKind::Sqlite => {
            let db = deepssh_db::Database::open(&config.db_path)?;
            info!("Using SQLite storage at {}", config.db_path.display());
            Store::new(Arc::new(SqliteBackend::new(Arc::new(db))))
        }
        StorageKind::Memory => {
            info!("Using in-memory storage; nothing survives a restart");
            Store::in_memory()
        }
    });
    store.load().await;
    info!(
        "Loaded {} servers ({})",
        store.get_servers().await.len(),
        store.load_status().await
    );

    // Every store change becomes a DataChanged event
    let dispatcher = Dispatcher::new();
    let _store_events = dispatcher.attach(&store);

    let app_state: AppState = Arc::new(AppStateInner {
        store,
        dispatcher: dispatcher.clone(),
        jwt_secret: config.jwt_secret.clone(),
        verifier,
    });

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(dispatcher);

    let app = deepssh_api::router(app_state)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("DeepSSH server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn ws_upgrade(State(dispatcher): State<Dispatcher>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(_) => {
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
