use std::sync::Arc;

use axum::{Router, middleware};
use chrononexus::{
    AppState, admin, auth, conferences,
    conferences::chat::ChatRegistry,
    config::Config,
    guard, notes, notifications, profiles, schedule,
    store::{MemoryStore, SqliteStore, Store},
    tickets,
};
use tower_http::{cors::CorsLayer, services::ServeDir};
use tower_sessions::{Expiry, MemoryStore as SessionStore, SessionManagerLayer, cookie::SameSite};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chrononexus=info,tower_http=warn")),
        )
        .init();

    let config = Config::from_env();

    let store: Arc<dyn Store> = if config.test_mode {
        tracing::warn!("test mode: in-memory store with seeded administrator, nothing persists");
        Arc::new(MemoryStore::seeded(&config)?)
    } else {
        Arc::new(SqliteStore::connect(&config).await?)
    };

    let session_store = SessionStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(30)));

    let state = AppState {
        store,
        config: config.clone(),
        chats: ChatRegistry::default(),
        http: reqwest::Client::new(),
    };

    let protected = Router::new()
        .merge(schedule::router())
        .merge(notes::router())
        .merge(notifications::router())
        .merge(profiles::router())
        .merge(conferences::router())
        .merge(tickets::router())
        .nest(
            "/admin",
            admin::router().route_layer(middleware::from_fn_with_state(
                state.clone(),
                guard::require_admin,
            )),
        )
        .route_layer(middleware::from_fn(guard::require_user));

    let app = Router::new()
        .merge(auth::router())
        .merge(protected)
        .nest_service("/uploads", ServeDir::new(&config.uploads_dir))
        .with_state(state)
        .layer(session_layer)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "chrononexus listening");
    axum::serve(listener, app).await?;
    Ok(())
}
