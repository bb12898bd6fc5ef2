use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    AppState,
    error::{AppError, AppResult},
    models::{AppStatus, MoviePayload},
    response,
};

pub async fn status(State(state): State<Arc<AppState>>) -> Json<AppStatus> {
    Json(AppStatus {
        status: "Available",
        environment: state.config.environment.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id: i32 = id.trim().parse().map_err(AppError::parameter("Not a valid movie id"))?;

    let movie =
        state.repo.get_movie(id).await.map_err(AppError::read("Movie not found with given id"))?;
    Ok(response::write_json(StatusCode::OK, &movie, "movie"))
}

pub async fn get_all_movies(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    let movies = state.repo.get_all_movies(None).await.map_err(AppError::read("Movies not found"))?;
    Ok(response::write_json(StatusCode::OK, &movies, "movies"))
}

pub async fn get_all_genres(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    let genres = state.repo.get_all_genres().await.map_err(AppError::read("Genres not found"))?;
    Ok(response::write_json(StatusCode::OK, &genres, "genres"))
}

pub async fn get_movies_by_genre(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let genre_id: i32 = id.trim().parse().map_err(AppError::parameter("Not a valid genre id"))?;

    let movies = state
        .repo
        .get_all_movies(Some(genre_id))
        .await
        .map_err(AppError::read("Movies not found for the given genre"))?;
    Ok(response::write_json(StatusCode::OK, &movies, "movies"))
}

/// Creates the movie when the payload id is empty or non-positive, updates it otherwise.
pub async fn edit_movie(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MoviePayload>, JsonRejection>,
) -> AppResult<Response> {
    let Json(payload) = payload.map_err(|rejection| AppError::Parameter {
        message: "Invalid movie payload",
        detail: rejection.body_text(),
    })?;

    let mut movie = payload.into_movie(jiff::Timestamp::now())?;

    if movie.id <= 0 {
        movie.id = state
            .repo
            .create_movie(&movie)
            .await
            .map_err(AppError::write("Failed to create a movie"))?;
        info!(id = movie.id, title = %movie.title, "movie created");
    } else {
        state.repo.update_movie(&movie).await.map_err(AppError::write("Failed to update a movie"))?;
        info!(id = movie.id, title = %movie.title, "movie updated");
    }

    Ok(response::write_json(StatusCode::OK, &movie, "movie"))
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    id: Option<String>,
}

pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DeleteQuery>,
) -> AppResult<Response> {
    let id: Option<i32> = match q.id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<i32>().map_err(AppError::parameter("Not a valid movie id"))?),
    };

    state.repo.delete_movie(id).await.map_err(AppError::write("Failed to delete a movie"))?;
    Ok(response::write_json(StatusCode::OK, &id, "deleted"))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    term: String,
}

pub async fn search_movies(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SearchQuery>,
) -> AppResult<Response> {
    let movies = state
        .repo
        .search_movie(q.term.trim())
        .await
        .map_err(AppError::read("Search failed"))?;
    Ok(response::write_json(StatusCode::OK, &movies, "movies"))
}
