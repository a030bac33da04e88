//! Signed, game-scoped player identity carried in a cookie.
//!
//! A browser can sit in many games at once, so there is one cookie per
//! game rather than a single session cookie. The cookie *name* is the
//! URL-escaped game name; the *value* is a token
//!
//! ```text
//! base64url(json {game, player}) "." base64url(hmac_sha256(json))
//! ```
//!
//! The game name is signed into the token as well as used for the cookie
//! name, so a token copied under another game's cookie does not resolve.
//! Nothing about a token is trusted until its signature verifies; any
//! failure resolves to "no player" rather than an error.

use std::fmt;
use std::sync::Arc;

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Errors that can occur when issuing a session credential.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The signing secret is empty.
    #[error("signing secret must not be empty")]
    EmptySecret,

    /// The MAC could not be keyed.
    #[error("invalid signing key: {0}")]
    Key(String),

    /// The claims could not be encoded.
    #[error("failed to encode session claims: {0}")]
    Encode(#[from] serde_json::Error),

    /// The resulting cookie is not a valid header value.
    #[error("invalid cookie header: {0}")]
    Header(String),
}

#[derive(Serialize, Deserialize)]
struct Claims {
    game: String,
    player: String,
}

/// Issues and verifies session credentials with the process's secret.
#[derive(Clone)]
pub struct SessionKeys {
    secret: Arc<[u8]>,
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeys").finish_non_exhaustive()
    }
}

impl SessionKeys {
    /// Create keys from the configured secret.
    pub fn new(secret: &str) -> Result<Self, SessionError> {
        if secret.is_empty() {
            return Err(SessionError::EmptySecret);
        }
        Ok(Self {
            secret: Arc::from(secret.as_bytes()),
        })
    }

    /// Name of the cookie holding the credential for `game`.
    pub fn cookie_name(game: &str) -> String {
        urlencoding::encode(game).into_owned()
    }

    /// Sign a token binding `player` to `game`.
    pub fn issue(&self, game: &str, player: &str) -> Result<String, SessionError> {
        let payload = serde_json::to_vec(&Claims {
            game: game.to_owned(),
            player: player.to_owned(),
        })?;
        let mut mac = self.mac()?;
        mac.update(&payload);
        let signature = mac.finalize().into_bytes();

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Verify `token` and return the player it binds to `game`.
    ///
    /// Returns `None` for a missing token, a malformed or forged token,
    /// or a token issued for a different game.
    pub fn resolve(&self, game: &str, token: Option<&str>) -> Option<String> {
        let (payload, signature) = token?.split_once('.')?;
        let payload = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

        let mut mac = self.mac().ok()?;
        mac.update(&payload);
        mac.verify_slice(&signature).ok()?;

        let claims: Claims = serde_json::from_slice(&payload).ok()?;
        (claims.game == game).then_some(claims.player)
    }

    /// Resolve the player for `game` from a request's `Cookie` headers.
    pub fn player_from_headers(&self, headers: &HeaderMap, game: &str) -> Option<String> {
        let name = Self::cookie_name(game);
        self.resolve(game, find_cookie(headers, &name))
    }

    /// Build the `Set-Cookie` value carrying a fresh credential.
    pub fn set_cookie(&self, game: &str, player: &str) -> Result<HeaderValue, SessionError> {
        let token = self.issue(game, player)?;
        let cookie = format!(
            "{}={token}; Path=/; HttpOnly; SameSite=Lax",
            Self::cookie_name(game)
        );
        HeaderValue::from_str(&cookie).map_err(|e| SessionError::Header(e.to_string()))
    }

    fn mac(&self) -> Result<HmacSha256, SessionError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| SessionError::Key(e.to_string()))
    }
}

/// Narrow capability for anything that can tell who the caller is in a
/// given game.
pub trait SessionAware {
    /// Keys used to verify credentials.
    fn session_keys(&self) -> &SessionKeys;

    /// The verified player for `game`, or `None` if the caller is
    /// anonymous there.
    fn player_for(&self, headers: &HeaderMap, game: &str) -> Option<String> {
        self.session_keys().player_from_headers(headers, game)
    }
}

/// Find the value of cookie `name` across all `Cookie` headers.
pub fn find_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn keys() -> SessionKeys {
        SessionKeys::new("test-secret").unwrap()
    }

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn issue_then_resolve_returns_player() {
        let keys = keys();
        let token = keys.issue("alpha", "barrett").unwrap();
        assert_eq!(keys.resolve("alpha", Some(&token)).as_deref(), Some("barrett"));
    }

    #[test]
    fn reserved_characters_round_trip_through_cookie_header() {
        let keys = keys();
        for game in ["piper at the gates of dawn", "a/b?c=d&e", "100% ;gold", "ünïcødé"] {
            let cookie = keys.set_cookie(game, "gilmour").unwrap();
            let pair = cookie.to_str().unwrap().split(';').next().unwrap().to_owned();
            let headers = headers_with_cookie(&format!("other=1; {pair}"));
            assert_eq!(
                keys.player_from_headers(&headers, game).as_deref(),
                Some("gilmour"),
                "game {game:?}"
            );
        }
    }

    #[test]
    fn cookie_names_do_not_collide() {
        assert_ne!(SessionKeys::cookie_name("a b"), SessionKeys::cookie_name("a+b"));
        assert_ne!(SessionKeys::cookie_name("a/b"), SessionKeys::cookie_name("a%2Fb"));
    }

    #[test]
    fn token_for_other_game_is_absent() {
        let keys = keys();
        let token = keys.issue("beta", "barrett").unwrap();
        assert_eq!(keys.resolve("alpha", Some(&token)), None);
    }

    #[test]
    fn token_moved_to_other_cookie_is_absent() {
        let keys = keys();
        let token = keys.issue("beta", "barrett").unwrap();
        let headers = headers_with_cookie(&format!("alpha={token}"));
        assert_eq!(keys.player_from_headers(&headers, "alpha"), None);
    }

    #[test]
    fn tampered_or_foreign_tokens_are_absent() {
        let keys = keys();
        let token = keys.issue("alpha", "barrett").unwrap();

        let (_, signature) = token.split_once('.').unwrap();
        let forged_payload = URL_SAFE_NO_PAD.encode(br#"{"game":"alpha","player":"admin"}"#);
        let forged = format!("{forged_payload}.{signature}");
        assert_eq!(keys.resolve("alpha", Some(&forged)), None);

        let other = SessionKeys::new("other-secret").unwrap();
        assert_eq!(other.resolve("alpha", Some(&token)), None);

        assert_eq!(keys.resolve("alpha", Some("garbage")), None);
        assert_eq!(keys.resolve("alpha", Some("a.b.c")), None);
        assert_eq!(keys.resolve("alpha", None), None);
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(matches!(SessionKeys::new(""), Err(SessionError::EmptySecret)));
    }

    #[test]
    fn set_cookie_is_scoped_to_root_path() {
        let cookie = keys().set_cookie("alpha", "barrett").unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("alpha="));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("HttpOnly"));
    }
}
