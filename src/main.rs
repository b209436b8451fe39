use axum::{
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod state;

use regdocs_backend::config;
use regdocs_backend::db;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "regdocs_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app_config = config::load_config().map_err(anyhow::Error::msg)?;
    tracing::info!(
        "Server will listen on {}:{}",
        app_config.server.host,
        app_config.server.port
    );

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| app_config.get_database_url());

    let pool = PgPool::connect(&database_url).await?;

    db::run_migrations(&pool).await?;

    let state = Arc::new(AppState { db: pool });

    let app = Router::new()
        .route("/api/health", get(api::server::health_check))
        .route("/api/documents", get(api::documents::list_documents))
        .route("/api/documents/export", get(api::documents::export_documents))
        .route("/api/documents/:id", get(api::documents::document_detail))
        .route(
            "/api/documents/:id/favorite",
            post(api::documents::toggle_favorite),
        )
        .route("/api/dockets", get(api::documents::list_docket_documents))
        .route("/api/search", get(api::search::search))
        .route("/api/search/export", get(api::search::export_search))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let bind_addr = app_config.get_bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
