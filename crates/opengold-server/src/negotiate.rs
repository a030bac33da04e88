//! JSON-versus-HTML content negotiation.
//!
//! Every endpoint serves two kinds of client: the browser, which gets HTML
//! pages and redirects, and the JavaScript poller, which asks for JSON.
//! The decision is a plain substring check on `Accept`.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::ACCEPT;
use axum::http::request::Parts;

/// Media type whose presence in `Accept` selects JSON responses.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// True iff the `Accept` value mentions the JSON media type.
pub fn wants_json(accept: Option<&str>) -> bool {
    accept.is_some_and(|accept| accept.contains(JSON_MEDIA_TYPE))
}

/// The shape a response should take for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// JSON bodies and bare status codes.
    Json,
    /// Rendered pages and redirects.
    Html,
}

impl ResponseShape {
    /// Decide the shape from request headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let accept = headers.get(ACCEPT).and_then(|value| value.to_str().ok());
        if wants_json(accept) {
            Self::Json
        } else {
            Self::Html
        }
    }
}

impl<S> FromRequestParts<S> for ResponseShape
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
