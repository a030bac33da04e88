//! Request extractors shared by the page and action handlers.

use axum::extract::rejection::QueryRejection;
use axum::extract::{FromRequestParts, Path, Query};
use axum::http::request::Parts;
use serde::Deserialize;

use crate::error::ApiError;

/// The percent-decoded `{game}` path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameName(pub String);

impl<S> FromRequestParts<S> for GameName
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(game) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::InvalidPath(e.body_text()))?;
        Ok(Self(game))
    }
}

/// The parsed query string, or `T::default()` when it does not parse
/// (for example a repeated `id`). Query parameters are hints here, never
/// a reason to fail a request.
pub fn query_or_default<T: Default>(query: Result<Query<T>, QueryRejection>) -> T {
    query.map(|Query(query)| query).unwrap_or_default()
}

/// Query parameters for the long-poll endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PollQuery {
    /// Last snapshot id the client saw.
    pub id: Option<String>,
}

impl PollQuery {
    /// The last-seen version, if `id` is a valid unsigned integer.
    ///
    /// A malformed id is treated as absent, so the poll returns the
    /// current snapshot at once instead of failing.
    pub fn last_seen(&self) -> Option<u64> {
        self.id.as_deref()?.trim().parse().ok()
    }
}

/// Query or form parameters for `/create`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateQuery {
    /// Name of the game to create.
    #[serde(default)]
    pub name: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(id: Option<&str>) -> PollQuery {
        PollQuery {
            id: id.map(String::from),
        }
    }

    #[test]
    fn numeric_id_is_last_seen() {
        assert_eq!(query(Some("12")).last_seen(), Some(12));
        assert_eq!(query(Some(" 0 ")).last_seen(), Some(0));
    }

    #[test]
    fn unparseable_query_string_falls_back_to_default() {
        let uri: axum::http::Uri = "/?id=1&id=2".parse().unwrap();
        let query = query_or_default(Query::<PollQuery>::try_from_uri(&uri));
        assert_eq!(query.last_seen(), None);

        let uri: axum::http::Uri = "/?id=7".parse().unwrap();
        let query = query_or_default(Query::<PollQuery>::try_from_uri(&uri));
        assert_eq!(query.last_seen(), Some(7));
    }

    #[test]
    fn missing_or_malformed_id_is_absent() {
        assert_eq!(query(None).last_seen(), None);
        assert_eq!(query(Some("")).last_seen(), None);
        assert_eq!(query(Some("abc")).last_seen(), None);
        assert_eq!(query(Some("-3")).last_seen(), None);
    }
}
