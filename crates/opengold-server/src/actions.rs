//! Write-side endpoint handlers: join, start, move, chat.
//!
//! Each handler resolves the caller from its session credential, checks
//! the arguments it needs, asks the engine, and hands an
//! [`ActionOutcome`] to the renderer. Authorization and validation
//! failures are both `400` and differ only by their reason text.
//!
//! Bodies are form-encoded. A missing or unreadable body is treated as
//! an empty form so the handler can report which field is missing.

use std::sync::Arc;

use axum::Form;
use axum::extract::State;
use axum::extract::rejection::FormRejection;
use axum::http::HeaderMap;
use axum::response::Response;
use serde::Deserialize;
use tracing::info;

use crate::error::ApiError;
use crate::extract::GameName;
use crate::negotiate::ResponseShape;
use crate::render::ActionOutcome;
use crate::session::SessionAware;
use crate::state::AppState;

/// Reason given when the caller has no credential for the game.
pub const NOT_IN_GAME: &str = "You are not in this game";
/// Reason given when the caller already holds a credential for the game.
pub const ALREADY_IN_GAME: &str = "You are already in this game";
/// Reason given when a join names no player.
pub const NAME_REQUIRED: &str = "You must specify a name to join a game.";
/// Reason given when a move names no choice.
pub const MOVE_REQUIRED: &str = "You must specify a move.";

/// Fields accepted by the write endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ActionForm {
    /// Display name to join as.
    pub player: Option<String>,
    /// The move to submit.
    #[serde(rename = "move")]
    pub choice: Option<String>,
    /// Chat text.
    pub message: Option<String>,
}

fn form_or_default(form: Result<Form<ActionForm>, FormRejection>) -> ActionForm {
    form.map(|Form(form)| form).unwrap_or_default()
}

/// `POST /{game}/join`: take a seat and receive a credential.
pub async fn join(
    State(state): State<Arc<AppState>>,
    shape: ResponseShape,
    GameName(game): GameName,
    headers: HeaderMap,
    form: Result<Form<ActionForm>, FormRejection>,
) -> Result<Response, ApiError> {
    let form = form_or_default(form);

    let outcome = if state.player_for(&headers, &game).is_some() {
        ActionOutcome::rejected(ALREADY_IN_GAME)
    } else {
        match form.player.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            None => ActionOutcome::rejected(NAME_REQUIRED),
            Some(player) if state.engine.join(&game, player)? => {
                info!(game = %game, player = %player, "player joined");
                ActionOutcome::Done {
                    cookie: Some(state.sessions.set_cookie(&game, player)?),
                }
            }
            Some(player) => ActionOutcome::rejected(format!("Could not add {player} to game")),
        }
    };

    Ok(state.renderer.action(shape, &game, outcome))
}

/// `POST /{game}/start`: vote to start, or continue, the game.
pub async fn start(
    State(state): State<Arc<AppState>>,
    shape: ResponseShape,
    GameName(game): GameName,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let outcome = match state.player_for(&headers, &game) {
        None => ActionOutcome::rejected(NOT_IN_GAME),
        Some(player) if state.engine.start(&game, &player)? => ActionOutcome::done(),
        Some(_) => ActionOutcome::rejected("Could not start game"),
    };

    Ok(state.renderer.action(shape, &game, outcome))
}

/// `POST /{game}/move`: submit this round's move.
pub async fn submit_move(
    State(state): State<Arc<AppState>>,
    shape: ResponseShape,
    GameName(game): GameName,
    headers: HeaderMap,
    form: Result<Form<ActionForm>, FormRejection>,
) -> Result<Response, ApiError> {
    let form = form_or_default(form);

    let outcome = match state.player_for(&headers, &game) {
        None => ActionOutcome::rejected(NOT_IN_GAME),
        Some(player) => match form.choice.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            None => ActionOutcome::rejected(MOVE_REQUIRED),
            Some(choice) if state.engine.submit_move(&game, &player, choice)? => {
                ActionOutcome::done()
            }
            Some(_) => ActionOutcome::rejected("Could not submit move"),
        },
    };

    Ok(state.renderer.action(shape, &game, outcome))
}

/// `POST /{game}/chat`: message everyone in the game. An empty message
/// succeeds without touching the game.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    shape: ResponseShape,
    GameName(game): GameName,
    headers: HeaderMap,
    form: Result<Form<ActionForm>, FormRejection>,
) -> Result<Response, ApiError> {
    let form = form_or_default(form);

    let outcome = match state.player_for(&headers, &game) {
        None => ActionOutcome::rejected(NOT_IN_GAME),
        Some(player) => match form.message.as_deref().filter(|m| !m.trim().is_empty()) {
            None => ActionOutcome::done(),
            Some(message) if state.engine.chat(&game, &player, message)? => ActionOutcome::done(),
            Some(_) => ActionOutcome::rejected("Could not send chat"),
        },
    };

    Ok(state.renderer.action(shape, &game, outcome))
}
