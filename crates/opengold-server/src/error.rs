//! Error types for the Opengold HTTP layer.
//!
//! [`ApiError`] covers failures that are not a game rejecting an action:
//! a bad path, an engine fault, a template that will not render. It
//! converts into a JSON response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.
//! Rejected actions are ordinary 400 responses built by the renderer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use opengold_game::EngineError;
use tracing::warn;

use crate::session::SessionError;

/// Errors that can occur while serving a request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No route matches the request.
    #[error("not found: {0}")]
    NotFound(String),

    /// A path segment could not be decoded.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The game engine or an event source failed.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// A session credential could not be issued.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// A page template failed to load or render.
    #[error("template error: {0}")]
    Template(String),

    /// A snapshot could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    /// The HTTP status this error maps to.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidPath(_) => StatusCode::BAD_REQUEST,
            Self::Engine(_) | Self::Session(_) | Self::Template(_) | Self::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<minijinja::Error> for ApiError {
    fn from(e: minijinja::Error) -> Self {
        Self::Template(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::NotFound(msg) | Self::InvalidPath(msg) => msg.clone(),
            other => {
                warn!(error = %other, "request failed");
                other.to_string()
            }
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(ApiError::NotFound(String::from("/x")).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::InvalidPath(String::from("bad")).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn engine_faults_map_to_500() {
        let err = ApiError::from(EngineError::SourceClosed(String::from("alpha")));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
