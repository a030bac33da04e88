//! Axum router construction for the Opengold server.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::actions;
use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// - `GET /`: game list long-poll
/// - `GET /create`: redirect to a named game
/// - `GET /{game}`: redirect to `/{game}/`
/// - `GET /{game}/`: single game long-poll
/// - `POST /{game}/join|start|move|chat`: write actions
///
/// Anything else is a JSON `404`.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::list_games))
        .route("/create", get(handlers::create_game))
        .route("/{game}", get(handlers::forward_to_game))
        .route("/{game}/", get(handlers::show_game))
        .route("/{game}/join", post(actions::join))
        .route("/{game}/start", post(actions::start))
        .route("/{game}/move", post(actions::submit_move))
        .route("/{game}/chat", post(actions::chat))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
