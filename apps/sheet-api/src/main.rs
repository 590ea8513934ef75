use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sheet_api::auth::session::SessionCookieValidator;
use sheet_api::config::Config;
use sheet_api::models::user::PgUserDirectory;
use sheet_api::realtime::{ConnectionRegistry, EventPublisher};
use sheet_api::AppState;

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing; env vars may be set externally)
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    // Connect to PostgreSQL.
    let db = sheet_api::db::pool::connect(&config.database_url).await;

    // One registry per process; the publisher shares it with the /ws handler.
    let registry = ConnectionRegistry::initialize();
    let publisher = EventPublisher::new(registry.clone());

    tracing::info!(
        signin_path = %config.gate.signin_path,
        protected = ?config.gate.protected_prefixes,
        "sheet-api configured"
    );

    let state = AppState {
        credentials: Arc::new(SessionCookieValidator::new(
            db.clone(),
            config.session_cookies.clone(),
        )),
        users: Arc::new(PgUserDirectory::new(db.clone())),
        db,
        publisher,
        config: Arc::new(config),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = sheet_api::routes::app(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "sheet-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry))
        .await
        .expect("server error");
}

/// Resolves on Ctrl-C, after asking every realtime connection to close.
///
/// If the signal handler cannot be installed the server keeps running.
async fn shutdown_signal(registry: Arc<ConnectionRegistry>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal; graceful shutdown disabled");
        std::future::pending::<()>().await;
    }
    let closed = registry.shutdown();
    tracing::info!(closed, "shutting down");
}
