mod config;
mod db;
mod entities;
mod error;
mod models;
mod repository;
mod response;
mod routes;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{config::Config, repository::Repository};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub repo: Repository,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,cinedex=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let db = db::connect_and_migrate(&config.database_url, config.max_connections).await?;
    let repo = Repository::new(db, config.query_timeout);

    let state = Arc::new(AppState { config: config.clone(), repo });

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, environment = %config.environment, "listening");
    axum::serve(listener, app(state)).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/status", get(routes::status))
        .route("/api/genres", get(routes::get_all_genres))
        .route("/api/genres/{id}", get(routes::get_movies_by_genre))
        .route("/api/movies", get(routes::get_all_movies))
        .route("/api/movies/{id}", get(routes::get_movie))
        .route("/api/search", get(routes::search_movies))
        .route("/api/admin/editmovie", post(routes::edit_movie))
        .route("/api/admin", delete(routes::delete_movie))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
