//! Turns poll and action outcomes into concrete HTTP responses.
//!
//! All branching on [`ResponseShape`] lives here.
//!
//! | Outcome | JSON client | HTML client |
//! |---------|-------------|-------------|
//! | poll delivered | `200` snapshot | `200` page |
//! | poll timed out | `204` | `302` to the same page |
//! | action done | `204` | `302` to the game page |
//! | action rejected | `400` `{"error","status"}` | `400` reason text |

use axum::Json;
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;

use crate::error::ApiError;
use crate::longpoll::PollOutcome;
use crate::negotiate::ResponseShape;
use crate::templates::{GAME_TEMPLATE, GAMES_TEMPLATE, Templates};

/// Which page a poll snapshot renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    /// The list of games.
    Games,
    /// A single game.
    Game,
}

impl Page {
    const fn template(self) -> &'static str {
        match self {
            Self::Games => GAMES_TEMPLATE,
            Self::Game => GAME_TEMPLATE,
        }
    }
}

/// Result of a write action, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action was accepted. `cookie` is a fresh credential to set.
    Done {
        /// `Set-Cookie` value, issued by a successful join.
        cookie: Option<HeaderValue>,
    },
    /// The action was refused, with a human-readable reason.
    Rejected(String),
}

impl ActionOutcome {
    /// Accepted, no credential change.
    pub const fn done() -> Self {
        Self::Done { cookie: None }
    }

    /// Refused with `reason`.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

#[derive(Serialize)]
struct PageContext<'a, T> {
    #[serde(flatten)]
    snapshot: &'a T,
    js_path: &'a str,
}

/// Renders outcomes in the negotiated shape.
#[derive(Debug)]
pub struct Renderer {
    templates: Templates,
    js_path: String,
}

impl Renderer {
    /// Create a renderer. `js_path` is exposed to every page.
    pub fn new(templates: Templates, js_path: impl Into<String>) -> Self {
        Self {
            templates,
            js_path: js_path.into(),
        }
    }

    /// Render a long-poll result. `canonical` is the page's own URL, the
    /// redirect target for HTML clients whose poll timed out.
    pub fn poll<T: Serialize>(
        &self,
        shape: ResponseShape,
        page: Page,
        canonical: &str,
        outcome: PollOutcome<T>,
    ) -> Result<Response, ApiError> {
        match (outcome, shape) {
            (PollOutcome::Delivered(snapshot), ResponseShape::Json) => {
                Ok(Json(snapshot).into_response())
            }
            (PollOutcome::Delivered(snapshot), ResponseShape::Html) => {
                let ctx = PageContext {
                    snapshot: &snapshot,
                    js_path: &self.js_path,
                };
                let html = self.templates.render(page.template(), &ctx)?;
                Ok(Html(html).into_response())
            }
            (PollOutcome::TimedOut, ResponseShape::Json) => {
                Ok(StatusCode::NO_CONTENT.into_response())
            }
            (PollOutcome::TimedOut, ResponseShape::Html) => Ok(redirect(canonical)),
        }
    }

    /// Render the result of a write action on `game`.
    pub fn action(&self, shape: ResponseShape, game: &str, outcome: ActionOutcome) -> Response {
        match outcome {
            ActionOutcome::Done { cookie } => {
                let mut response = match shape {
                    ResponseShape::Json => StatusCode::NO_CONTENT.into_response(),
                    ResponseShape::Html => redirect(&game_path(game)),
                };
                if let Some(cookie) = cookie {
                    response.headers_mut().append(SET_COOKIE, cookie);
                }
                response
            }
            ActionOutcome::Rejected(reason) => match shape {
                ResponseShape::Json => {
                    let body = serde_json::json!({
                        "error": reason,
                        "status": StatusCode::BAD_REQUEST.as_u16(),
                    });
                    (StatusCode::BAD_REQUEST, Json(body)).into_response()
                }
                ResponseShape::Html => (StatusCode::BAD_REQUEST, reason).into_response(),
            },
        }
    }
}

/// A `302 Found` to `location`.
pub fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
        Err(e) => {
            ApiError::InvalidPath(format!("unredirectable location {location:?}: {e}"))
                .into_response()
        }
    }
}

/// Canonical URL of a game page.
pub fn game_path(game: &str) -> String {
    format!("/{}/", urlencoding::encode(game))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use opengold_game::GameListing;

    use super::*;

    fn renderer() -> Renderer {
        Renderer::new(Templates::builtin().unwrap(), "/js/build")
    }

    fn listing() -> GameListing {
        GameListing {
            id: 3,
            games: Vec::new(),
        }
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn game_path_escapes_name() {
        assert_eq!(game_path("alpha"), "/alpha/");
        assert_eq!(game_path("a b/c"), "/a%20b%2Fc/");
    }

    #[tokio::test]
    async fn delivered_json_is_the_snapshot() {
        let response = renderer()
            .poll(ResponseShape::Json, Page::Games, "/", PollOutcome::Delivered(listing()))
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["games"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn delivered_html_gets_js_path() {
        let response = renderer()
            .poll(ResponseShape::Html, Page::Games, "/", PollOutcome::Delivered(listing()))
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("/js/build/main.js"));
    }

    #[test]
    fn timed_out_poll_by_shape() {
        let renderer = renderer();
        let json = renderer
            .poll::<GameListing>(ResponseShape::Json, Page::Games, "/", PollOutcome::TimedOut)
            .unwrap();
        assert_eq!(json.status(), StatusCode::NO_CONTENT);

        let html = renderer
            .poll::<GameListing>(ResponseShape::Html, Page::Game, "/alpha/", PollOutcome::TimedOut)
            .unwrap();
        assert_eq!(html.status(), StatusCode::FOUND);
        assert_eq!(html.headers()[LOCATION], "/alpha/");
    }

    #[test]
    fn done_action_carries_cookie() {
        let cookie = HeaderValue::from_static("alpha=token; Path=/");
        let response = renderer().action(
            ResponseShape::Json,
            "alpha",
            ActionOutcome::Done {
                cookie: Some(cookie.clone()),
            },
        );
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[SET_COOKIE], cookie);
    }

    #[test]
    fn done_action_redirects_browsers() {
        let response = renderer().action(ResponseShape::Html, "dark side", ActionOutcome::done());
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[LOCATION], "/dark%20side/");
    }

    #[tokio::test]
    async fn rejected_action_keeps_reason_verbatim() {
        let renderer = renderer();
        let html = renderer.action(
            ResponseShape::Html,
            "beta",
            ActionOutcome::rejected("You are not in this game"),
        );
        assert_eq!(html.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(html).await, "You are not in this game");

        let json = renderer.action(
            ResponseShape::Json,
            "beta",
            ActionOutcome::rejected("You are not in this game"),
        );
        assert_eq!(json.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body_text(json).await).unwrap();
        assert_eq!(body["error"], "You are not in this game");
    }
}
