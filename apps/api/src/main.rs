mod analytics;
mod auth;
mod billing;
mod config;
mod cv;
mod db;
mod errors;
mod models;
mod notifications;
mod persistence;
mod requests;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::identity_toolkit::IdentityToolkitProvider;
use crate::auth::profile::PgProfileStore;
use crate::auth::session::SessionManager;
use crate::billing::gateway::DemoPaymentGateway;
use crate::config::Config;
use crate::cv::editor::CvEditor;
use crate::db::create_pool;
use crate::notifications::DemoNotifier;
use crate::persistence::adapter::DocumentStoreAdapter;
use crate::persistence::cache::FileCache;
use crate::persistence::store::PgDocumentStore;
use crate::requests::store::PgRequestStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV Builder API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url)?;

    // Document persistence: Postgres first, local file cache as fallback
    let cache = Arc::new(FileCache::new(&config.cache_dir));
    let adapter = Arc::new(DocumentStoreAdapter::new(
        Arc::new(PgDocumentStore::new(db.clone())),
        cache,
    ));
    let editor = Arc::new(CvEditor::new(adapter));
    info!("Local document cache at {}", config.cache_dir);

    let auth = Arc::new(IdentityToolkitProvider::new(
        config.identity_api_key.clone(),
        config.identity_base_url.clone(),
    )?);
    let profiles = Arc::new(PgProfileStore::new(db.clone()));
    let session = Arc::new(SessionManager::start(auth.clone(), profiles.clone()));
    editor.clone().follow_session(session.subscribe());
    info!("Session manager started");

    let state = AppState {
        auth,
        profiles,
        session,
        editor,
        requests: Arc::new(PgRequestStore::new(db)),
        notifier: Arc::new(DemoNotifier::new(
            config.admin_email.clone(),
            config.app_name.clone(),
        )),
        payments: Arc::new(DemoPaymentGateway::new()),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
