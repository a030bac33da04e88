//! Read-side endpoint handlers: long-polls and redirects.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Long-poll on the game list |
//! | `GET` | `/create` | Redirect to a game page by name |
//! | `GET` | `/{game}` | Redirect to `/{game}/` |
//! | `GET` | `/{game}/` | Long-poll on one game |
//!
//! The write endpoints live in [`crate::actions`].

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Uri};
use axum::response::Response;

use crate::error::ApiError;
use crate::extract::{CreateQuery, GameName, PollQuery, query_or_default};
use crate::negotiate::ResponseShape;
use crate::render::{Page, game_path, redirect};
use crate::session::SessionAware;
use crate::state::AppState;

/// `GET /`: wait for the game list to change past `id`.
pub async fn list_games(
    State(state): State<Arc<AppState>>,
    shape: ResponseShape,
    query: Result<Query<PollQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let query = query_or_default(query);
    let cursor = state.engine.watch_games(query.last_seen())?;
    let outcome = state.poll.await_update(cursor).await?;
    state.renderer.poll(shape, Page::Games, "/", outcome)
}

/// `GET /{game}/`: wait for `game` to change past `id`, as seen by the
/// caller's session.
///
/// A game nobody has joined yet renders with an empty roster, which the
/// page turns into the join form.
pub async fn show_game(
    State(state): State<Arc<AppState>>,
    shape: ResponseShape,
    GameName(game): GameName,
    headers: HeaderMap,
    query: Result<Query<PollQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let query = query_or_default(query);
    let player = state.player_for(&headers, &game);
    let cursor = state
        .engine
        .watch_game(&game, player.as_deref(), query.last_seen())?;
    let outcome = state.poll.await_update(cursor).await?;
    state.renderer.poll(shape, Page::Game, &game_path(&game), outcome)
}

/// `GET /create?name=`: jump to the named game's page, or back to the
/// list when no name was given.
pub async fn create_game(query: Result<Query<CreateQuery>, QueryRejection>) -> Response {
    let query = query_or_default(query);
    let name = query.name.trim();
    if name.is_empty() {
        redirect("/")
    } else {
        redirect(&game_path(name))
    }
}

/// `GET /{game}`: add the trailing slash.
pub async fn forward_to_game(GameName(game): GameName) -> Response {
    redirect(&game_path(&game))
}

/// Fallback for unmatched routes.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}
